use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use crate::services::notification_dedup::SEEN_SET_KEY;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    // Short timeout so the healthcheck answers even if the store hangs.
    let seen_store_ok = match tokio::time::timeout(
        Duration::from_secs(3),
        state.key_value_store.get(SEEN_SET_KEY),
    )
    .await
    {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Health check seen-store read failed");
            false
        }
        Err(_) => {
            tracing::error!("Health check seen-store read timed out (3s)");
            false
        }
    };

    let status = if seen_store_ok && state.ledger_configured {
        "ok"
    } else {
        "degraded"
    };
    Json(json!({
        "status": status,
        "now": Utc::now().to_rfc3339(),
        "ledger": state.ledger_configured,
        "seen_store": seen_store_ok,
    }))
}

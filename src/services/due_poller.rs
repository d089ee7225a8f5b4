use std::time::Duration;

use tokio::time::sleep;

use crate::{auth::OwnerContext, state::AppState};

const MIN_POLL_INTERVAL_SECONDS: u64 = 60;

/// Seen-set scope for background passes, kept apart from interactive callers.
pub const DUE_POLLER_SCOPE: &str = "due-poller";

/// Periodic reconciliation pass so due alerts fire without a client polling.
///
/// Each pass runs in its own `tokio::spawn`; a failing pass is logged and the
/// loop keeps its cadence.
pub async fn run_due_poller(state: AppState) {
    let Some(token) = state.config.ledger_service_token.clone() else {
        tracing::warn!("Due poller: no LEDGER_SERVICE_TOKEN configured, exiting");
        return;
    };
    let owner = OwnerContext::new(token).with_scope(DUE_POLLER_SCOPE);
    let interval = Duration::from_secs(
        state
            .config
            .due_poll_interval_seconds
            .max(MIN_POLL_INTERVAL_SECONDS),
    );
    let window_days = state.config.due_window_days;

    tracing::info!(
        interval_seconds = interval.as_secs(),
        window_days,
        "Due poller started"
    );

    loop {
        sleep(interval).await;

        let overview = state.overview.clone();
        let owner = owner.clone();
        let handle = tokio::spawn(async move { overview.run_pass(&owner, window_days).await });

        match handle.await {
            Ok(Ok(pass)) => {
                if let Some(alert) = pass.alert {
                    tracing::info!(
                        alert_count = alert.alert_count,
                        message = %alert.message,
                        "Due poller: new payments due soon"
                    );
                }
                if !pass.degraded.is_empty() {
                    tracing::warn!(degraded = ?pass.degraded, "Due poller: pass ran degraded");
                }
            }
            Ok(Err(e)) if e.is_auth() => {
                tracing::error!(error = %e, "Due poller: service credential rejected, stopping");
                return;
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "Due poller: pass failed"),
            Err(e) => tracing::error!(error = %e, "Due poller: pass panicked"),
        }
    }
}

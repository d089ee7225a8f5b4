use axum::{routing::get, Router};

use crate::state::AppState;

pub mod billing;
pub mod health;
pub mod payments;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(billing::router())
        .merge(payments::router())
}

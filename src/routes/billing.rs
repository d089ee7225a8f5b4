use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    schemas::{validate_input, QuoteInput},
    services::{
        money::Money,
        pricing::{quote_stay, BillingQuote, RoomRate},
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/billing/quote", axum::routing::post(create_quote))
}

/// Prices a prospective stay for the booking form. Pure computation; no
/// collaborator is contacted, so no credential is required.
async fn create_quote(
    State(state): State<AppState>,
    Json(payload): Json<QuoteInput>,
) -> AppResult<Json<BillingQuote>> {
    validate_input(&payload)?;

    let rate = RoomRate::from_raw(
        &payload.billing_policy,
        Money::new(payload.monthly_rate),
        payload.daily_rate.map(Money::new),
    )?;
    let quote = quote_stay(
        &rate,
        payload.check_in,
        payload.check_out,
        state.config.daily_rate_divisor,
        &state.config.currency_code,
    )?;

    Ok(Json(quote))
}

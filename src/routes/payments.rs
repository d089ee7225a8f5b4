use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::require_owner_context,
    error::AppResult,
    schemas::{validate_input, InvoicePath, OverviewQuery},
    services::{
        payment_ledger::InvoiceId,
        payment_overview::PaymentOverview,
        settlement::{SettlementOutcome, SettlementRequest},
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/payments/overview", axum::routing::get(payment_overview))
        .route("/payments/settle", axum::routing::post(settle_obligation))
        .route(
            "/payments/invoices/{invoice_id}/refresh",
            axum::routing::post(refresh_invoice),
        )
}

async fn payment_overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
    headers: HeaderMap,
) -> AppResult<Json<PaymentOverview>> {
    validate_input(&query)?;
    let owner = require_owner_context(&headers)?;
    let window_days = query.window_days.unwrap_or(state.config.due_window_days);

    let overview = state.overview.run_pass(&owner, window_days).await?;
    Ok(Json(overview))
}

async fn settle_obligation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SettlementRequest>,
) -> AppResult<Json<SettlementOutcome>> {
    let owner = require_owner_context(&headers)?;
    let outcome = state.settlement.dispatch(&owner, payload).await?;
    Ok(Json(outcome))
}

async fn refresh_invoice(
    State(state): State<AppState>,
    Path(path): Path<InvoicePath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let owner = require_owner_context(&headers)?;
    let invoice_id = InvoiceId(path.invoice_id);
    let status = state.settlement.refresh_status(&owner, invoice_id).await?;

    Ok(Json(json!({
        "invoiceId": invoice_id,
        "status": status,
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::{
        error::BillingError,
        routes::testing::{app, send},
        services::{
            booking_directory::BookingId,
            clock::FixedClock,
            money::Money,
            payment_ledger::{InvoiceId, InvoiceRecord},
            reconciliation::ObligationStatus,
            test_support::{date, FakeBookings, FakeLedger, LedgerCall},
        },
        state::AppState,
    };

    struct Fixture {
        ledger: Arc<FakeLedger>,
        bookings: Arc<FakeBookings>,
        state: AppState,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(FakeLedger::with_invoices(vec![InvoiceRecord {
            id: InvoiceId(9),
            booking_id: Some(BookingId(101)),
            status: ObligationStatus::Unpaid,
            amount: Money::new(6000),
            due_date: Some(date(2024, 6, 10)),
            description: None,
        }]));
        let bookings = Arc::new(FakeBookings::default());
        let state = AppState::for_tests(
            ledger.clone(),
            bookings.clone(),
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 6, 8, 9, 0, 0).unwrap(),
            )),
        );
        Fixture {
            ledger,
            bookings,
            state,
        }
    }

    #[tokio::test]
    async fn overview_requires_a_credential() {
        let f = fixture();
        let (status, body) = send(
            app(f.state),
            Method::GET,
            "/v1/payments/overview",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["detail"].as_str().is_some());
        assert!(f.ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn overview_classifies_and_alerts() {
        let f = fixture();
        let (status, body) = send(
            app(f.state),
            Method::GET,
            "/v1/payments/overview?window_days=5",
            Some("owner-token"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["windowDays"], 5);
        assert_eq!(body["dueSoon"][0]["id"], "invoice-9");
        assert_eq!(body["dueSoon"][0]["daysRemaining"], 2);
        assert_eq!(body["alert"]["alertCount"], 1);
        assert_eq!(body["degraded"], json!([]));
    }

    #[tokio::test]
    async fn overview_rejected_credential_is_unauthorized() {
        let f = fixture();
        f.bookings
            .fail(BillingError::Auth("Session expired.".to_string()));
        let (status, body) = send(
            app(f.state),
            Method::GET,
            "/v1/payments/overview",
            Some("stale-token"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Session expired.");
    }

    #[tokio::test]
    async fn settle_synthetic_obligation_creates_invoice_first() {
        let f = fixture();
        let (status, body) = send(
            app(f.state),
            Method::POST,
            "/v1/payments/settle",
            Some("owner-token"),
            Some(json!({
                "obligation": {
                    "id": "booking-42",
                    "source": "synthetic",
                    "bookingId": 42,
                    "status": "unpaid",
                    "statusLabel": "Unpaid",
                    "amount": 6000,
                    "dueDate": "2024-06-10"
                },
                "channel": { "kind": "gateway", "method": "gcash" }
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "gateway_requested");
        assert_eq!(body["invoiceId"], 5042);
        assert_eq!(body["checkoutUrl"], "https://pay.example.com/5042/gcash");
        assert_eq!(f.ledger.calls()[0], LedgerCall::CreateInvoice(BookingId(42)));
    }

    #[tokio::test]
    async fn settle_rejects_paid_obligation() {
        let f = fixture();
        let (status, _) = send(
            app(f.state),
            Method::POST,
            "/v1/payments/settle",
            Some("owner-token"),
            Some(json!({
                "obligation": {
                    "id": "invoice-9",
                    "source": "remote",
                    "invoiceId": 9,
                    "status": "paid",
                    "statusLabel": "paid",
                    "amount": 6000
                },
                "channel": { "kind": "offline" }
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(f.ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn refresh_reports_gateway_status() {
        let f = fixture();
        let (status, body) = send(
            app(f.state),
            Method::POST,
            "/v1/payments/invoices/9/refresh",
            Some("owner-token"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invoiceId"], 9);
        assert_eq!(body["status"], "paid");
        assert_eq!(f.ledger.calls(), vec![LedgerCall::Refresh(InvoiceId(9))]);
    }
}

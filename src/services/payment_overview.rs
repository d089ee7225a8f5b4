use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    auth::OwnerContext,
    error::BillingResult,
    services::{
        booking_directory::BookingDirectory,
        clock::SharedClock,
        due_window::{classify_obligations, ClassifiedObligation},
        notification_dedup::{DueAlert, NotificationSeenStore},
        payment_ledger::{PaymentLedger, PaymentStats},
        reconciliation::reconcile_obligations,
        settled::{settle, Settled},
    },
};

pub const BUCKET_BOOKINGS: &str = "bookings";
pub const BUCKET_STATS: &str = "stats";
pub const BUCKET_INVOICES: &str = "invoices";
pub const BUCKET_NOTIFICATIONS: &str = "notifications";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOverview {
    pub generated_at: DateTime<Utc>,
    pub window_days: u32,
    pub stats: PaymentStats,
    pub due_soon: Vec<ClassifiedObligation>,
    pub general_unpaid: Vec<ClassifiedObligation>,
    pub overdue: Vec<ClassifiedObligation>,
    pub alert: Option<DueAlert>,
    /// Buckets whose source request failed and were served empty.
    pub degraded: Vec<&'static str>,
}

/// One reconciliation pass: gather, reconcile, classify, and dedup alerts.
pub struct PaymentOverviewService {
    bookings: Arc<dyn BookingDirectory>,
    ledger: Arc<dyn PaymentLedger>,
    seen: Arc<NotificationSeenStore>,
    clock: SharedClock,
    timezone: Tz,
}

impl PaymentOverviewService {
    pub fn new(
        bookings: Arc<dyn BookingDirectory>,
        ledger: Arc<dyn PaymentLedger>,
        seen: Arc<NotificationSeenStore>,
        clock: SharedClock,
        timezone: Tz,
    ) -> Self {
        Self {
            bookings,
            ledger,
            seen,
            clock,
            timezone,
        }
    }

    /// Reads fail soft per bucket. Only an auth failure aborts the pass, and in
    /// that case the seen-set is left untouched. Alerts are deduplicated per
    /// `owner.scope`.
    pub async fn run_pass(
        &self,
        owner: &OwnerContext,
        window_days: u32,
    ) -> BillingResult<PaymentOverview> {
        let (bookings, stats, invoices) = tokio::join!(
            settle(self.bookings.list_bookings(owner)),
            settle(self.ledger.get_stats(owner)),
            settle(self.ledger.list_invoices(owner)),
        );

        if let Some(error) = bookings
            .auth_error()
            .or_else(|| stats.auth_error())
            .or_else(|| invoices.auth_error())
        {
            tracing::warn!(error = %error, "Overview pass aborted, credential rejected");
            return Err(error.clone());
        }

        let mut degraded = Vec::new();
        let bookings = bookings.or_degrade(BUCKET_BOOKINGS, &mut degraded);
        let stats = stats.or_degrade(BUCKET_STATS, &mut degraded);
        let invoices_degraded = matches!(invoices, Settled::Rejected(_));
        let invoices = invoices.or_degrade(BUCKET_INVOICES, &mut degraded);

        let obligations = reconcile_obligations(&invoices, &bookings);
        let now = self.clock.now();
        let classification = classify_obligations(&obligations, window_days, now, self.timezone);

        // Without the ledger list every invoiced booking looks uninvoiced, so
        // the due set is not trustworthy enough to alert on.
        let alert = if invoices_degraded {
            None
        } else {
            match self
                .seen
                .record_due_soon(&owner.scope, &classification.due_soon_ids())
                .await
            {
                Ok(alert) => alert,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist notification seen-set");
                    degraded.push(BUCKET_NOTIFICATIONS);
                    None
                }
            }
        };

        tracing::info!(
            due_soon = classification.due_soon.len(),
            general_unpaid = classification.general_unpaid.len(),
            overdue = classification.overdue.len(),
            degraded = degraded.len(),
            "Payment overview pass completed"
        );

        Ok(PaymentOverview {
            generated_at: now,
            window_days,
            stats,
            due_soon: classification.due_soon,
            general_unpaid: classification.general_unpaid,
            overdue: classification.overdue,
            alert,
            degraded,
        })
    }
}

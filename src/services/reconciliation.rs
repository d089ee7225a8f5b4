use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::{
    booking_directory::{Booking, BookingId, BookingPaymentStatus, BookingStatus},
    money::Money,
    payment_ledger::{InvoiceId, InvoiceRecord},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObligationStatus {
    Unpaid,
    Partial,
    Paid,
    Refunded,
    Pending,
    Cancelled,
    Other(String),
}

impl ObligationStatus {
    /// Statuses that still expect money from the tenant.
    pub fn is_payable(&self) -> bool {
        matches!(self, Self::Unpaid | Self::Pending | Self::Partial)
    }
}

impl From<String> for ObligationStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Self::Unpaid,
            "partial" | "partial_paid" | "partialpaid" | "partially_paid" => Self::Partial,
            "paid" => Self::Paid,
            "refunded" => Self::Refunded,
            "pending" => Self::Pending,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(raw),
        }
    }
}

impl From<ObligationStatus> for String {
    fn from(status: ObligationStatus) -> Self {
        match status {
            ObligationStatus::Unpaid => "unpaid".to_string(),
            ObligationStatus::Partial => "partial".to_string(),
            ObligationStatus::Paid => "paid".to_string(),
            ObligationStatus::Refunded => "refunded".to_string(),
            ObligationStatus::Pending => "pending".to_string(),
            ObligationStatus::Cancelled => "cancelled".to_string(),
            ObligationStatus::Other(raw) => raw,
        }
    }
}

/// Stable key used for classification partitions and the notification seen-set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObligationId(String);

impl ObligationId {
    pub fn for_invoice(invoice_id: InvoiceId) -> Self {
        Self(format!("invoice-{invoice_id}"))
    }

    pub fn for_booking(booking_id: BookingId) -> Self {
        Self(format!("booking-{booking_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ObligationId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObligationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationSource {
    /// Backed by a ledger invoice.
    Remote,
    /// Projected from a confirmed booking that has no invoice yet.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obligation {
    pub id: ObligationId,
    pub source: ObligationSource,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub booking_id: Option<BookingId>,
    pub status: ObligationStatus,
    pub status_label: String,
    pub amount: Money,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Obligation {
    pub fn from_invoice(invoice: &InvoiceRecord) -> Self {
        Self {
            id: ObligationId::for_invoice(invoice.id),
            source: ObligationSource::Remote,
            invoice_id: Some(invoice.id),
            booking_id: invoice.booking_id,
            status: invoice.status.clone(),
            status_label: String::from(invoice.status.clone()),
            amount: invoice.amount,
            due_date: invoice.due_date,
            description: invoice.description.clone(),
        }
    }

    /// Projects an obligation for a confirmed booking whose payment is still
    /// open. Returns `None` for bookings that owe nothing or cannot be keyed.
    pub fn from_booking(booking: &Booking) -> Option<Self> {
        let booking_id = booking.id?;
        if booking.status != BookingStatus::Confirmed {
            return None;
        }
        let (status, status_label) = match booking.payment_status {
            BookingPaymentStatus::Unpaid => (ObligationStatus::Unpaid, "Unpaid"),
            BookingPaymentStatus::Partial => (ObligationStatus::Partial, "PartialPaid"),
            _ => return None,
        };

        let description = match (&booking.property_ref, &booking.room_ref) {
            (Some(property), Some(room)) => Some(format!("Stay at {property} / {room}")),
            (Some(place), None) | (None, Some(place)) => Some(format!("Stay at {place}")),
            (None, None) => None,
        };

        Some(Self {
            id: ObligationId::for_booking(booking_id),
            source: ObligationSource::Synthetic,
            invoice_id: None,
            booking_id: Some(booking_id),
            status,
            status_label: status_label.to_string(),
            amount: booking.amount_owed(),
            due_date: Some(booking.start_date),
            description,
        })
    }
}

/// Merges ledger invoices with obligations projected from uninvoiced bookings.
///
/// Synthetic entries come first. A booking that already has a ledger record
/// never gets a synthetic twin, and each booking is projected at most once.
/// Ledger records themselves are authoritative and kept as reported, so the
/// one-obligation-per-booking rule binds synthetic entries only; a long stay
/// may legitimately carry several ledger invoices.
pub fn reconcile_obligations(invoices: &[InvoiceRecord], bookings: &[Booking]) -> Vec<Obligation> {
    let mut covered: HashSet<BookingId> = invoices
        .iter()
        .filter_map(|invoice| invoice.booking_id)
        .collect();

    let mut merged: Vec<Obligation> = Vec::with_capacity(invoices.len() + bookings.len());
    let mut skipped_unkeyed = 0_usize;

    for booking in bookings {
        let Some(booking_id) = booking.id else {
            skipped_unkeyed += 1;
            continue;
        };
        if covered.contains(&booking_id) {
            continue;
        }
        if let Some(obligation) = Obligation::from_booking(booking) {
            covered.insert(booking_id);
            merged.push(obligation);
        }
    }

    let synthetic = merged.len();
    merged.extend(invoices.iter().map(Obligation::from_invoice));

    if skipped_unkeyed > 0 {
        tracing::warn!(count = skipped_unkeyed, "Skipped bookings without an id during reconciliation");
    }
    tracing::debug!(
        synthetic,
        remote = invoices.len(),
        "Reconciled payment obligations"
    );

    merged
}

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    auth::OwnerContext,
    error::BillingResult,
    services::{
        money::Money,
        payment_ledger::{decode_list, send_json},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub i64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Other(String),
}

impl From<String> for BookingStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "confirmed" | "approved" => Self::Confirmed,
            "cancelled" | "canceled" | "rejected" => Self::Cancelled,
            "completed" => Self::Completed,
            _ => Self::Other(raw),
        }
    }
}

impl From<BookingStatus> for String {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Pending => "pending".to_string(),
            BookingStatus::Confirmed => "confirmed".to_string(),
            BookingStatus::Cancelled => "cancelled".to_string(),
            BookingStatus::Completed => "completed".to_string(),
            BookingStatus::Other(raw) => raw,
        }
    }
}

/// Booking-level payment progress, independent of any ledger invoice.
/// A missing or blank status decodes as `Other("")` and is never treated as
/// money owed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingPaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Refunded,
    Other(String),
}

impl From<String> for BookingPaymentStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Self::Unpaid,
            "partial" | "partial_paid" | "partialpaid" | "partially_paid" => Self::Partial,
            "paid" => Self::Paid,
            "refunded" => Self::Refunded,
            _ => Self::Other(raw),
        }
    }
}

impl Default for BookingPaymentStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<BookingPaymentStatus> for String {
    fn from(status: BookingPaymentStatus) -> Self {
        match status {
            BookingPaymentStatus::Unpaid => "unpaid".to_string(),
            BookingPaymentStatus::Partial => "partial".to_string(),
            BookingPaymentStatus::Paid => "paid".to_string(),
            BookingPaymentStatus::Refunded => "refunded".to_string(),
            BookingPaymentStatus::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default)]
    pub id: Option<BookingId>,
    pub status: BookingStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub payment_status: BookingPaymentStatus,
    #[serde(default)]
    pub total_amount: Option<Money>,
    #[serde(default)]
    pub monthly_rent: Option<Money>,
    #[serde(default)]
    pub property_ref: Option<String>,
    #[serde(default)]
    pub room_ref: Option<String>,
}

impl Booking {
    /// What the tenant owes for the booking: the booking total, else the rent.
    pub fn amount_owed(&self) -> Money {
        self.total_amount
            .or(self.monthly_rent)
            .unwrap_or(Money::ZERO)
    }
}

#[async_trait]
pub trait BookingDirectory: Send + Sync {
    async fn list_bookings(&self, owner: &OwnerContext) -> BillingResult<Vec<Booking>>;
}

/// Booking Directory backed by the marketplace REST API.
pub struct HttpBookingDirectory {
    http_client: Client,
    base_url: String,
}

impl HttpBookingDirectory {
    pub fn new(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BookingDirectory for HttpBookingDirectory {
    async fn list_bookings(&self, owner: &OwnerContext) -> BillingResult<Vec<Booking>> {
        let request = self
            .http_client
            .get(format!("{}/bookings", self.base_url))
            .bearer_auth(&owner.access_token);
        let body: Value = send_json(request, "Booking directory").await?;
        decode_list(body, "bookings")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Booking, BookingId, BookingPaymentStatus, BookingStatus};
    use crate::services::money::Money;

    #[test]
    fn decodes_booking_with_loose_status_casing() {
        let booking: Booking = serde_json::from_value(json!({
            "id": 101,
            "status": "Confirmed",
            "start_date": "2024-06-10",
            "end_date": "2024-07-25",
            "payment_status": "PARTIAL",
            "monthly_rent": 6000,
            "room_ref": "room-7"
        }))
        .unwrap();

        assert_eq!(booking.id, Some(BookingId(101)));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Partial);
        assert_eq!(booking.amount_owed(), Money::new(6000));
        assert_eq!(booking.property_ref, None);
    }

    #[test]
    fn total_amount_wins_over_rent() {
        let booking: Booking = serde_json::from_value(json!({
            "id": 7,
            "status": "confirmed",
            "start_date": "2024-06-10",
            "end_date": "2024-06-20",
            "total_amount": 3000,
            "monthly_rent": 6000
        }))
        .unwrap();
        assert_eq!(booking.amount_owed(), Money::new(3000));
        assert_eq!(
            booking.payment_status,
            BookingPaymentStatus::Other(String::new())
        );
    }

    #[test]
    fn keeps_unknown_statuses_verbatim() {
        assert_eq!(
            BookingStatus::from("on_hold".to_string()),
            BookingStatus::Other("on_hold".to_string())
        );
        assert_eq!(String::from(BookingStatus::from("CANCELED".to_string())), "cancelled");
    }
}

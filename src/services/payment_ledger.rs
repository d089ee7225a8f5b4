use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::{
    auth::OwnerContext,
    error::{BillingError, BillingResult},
    services::{booking_directory::BookingId, money::Money, reconciliation::ObligationStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub i64);

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authoritative invoice as reported by the Payment Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: InvoiceId,
    #[serde(default, alias = "booking_ref")]
    pub booking_id: Option<BookingId>,
    pub status: ObligationStatus,
    #[serde(alias = "amount_minor")]
    pub amount: Money,
    #[serde(default, deserialize_with = "deserialize_lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentStats {
    pub total_paid: Money,
    pub total_unpaid: Money,
    pub total_overdue: Money,
    pub paid_count: u32,
    pub unpaid_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewaySource {
    pub checkout_url: String,
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflinePaymentRecord {
    pub amount_minor: Money,
    pub method: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineAck {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default = "default_offline_status")]
    pub status: String,
}

fn default_offline_status() -> String {
    "pending_confirmation".to_string()
}

#[async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn list_invoices(&self, owner: &OwnerContext) -> BillingResult<Vec<InvoiceRecord>>;

    async fn get_stats(&self, owner: &OwnerContext) -> BillingResult<PaymentStats>;

    /// Idempotent per booking on the ledger side.
    async fn create_invoice_for_booking(
        &self,
        owner: &OwnerContext,
        booking_id: BookingId,
    ) -> BillingResult<InvoiceId>;

    async fn create_gateway_source(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
        method: &str,
        return_url: Option<&str>,
    ) -> BillingResult<GatewaySource>;

    /// `record.amount_minor` is caller-supplied. Implementations must
    /// validate it against the invoice balance; the engine does not.
    async fn create_offline_record(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
        record: &OfflinePaymentRecord,
    ) -> BillingResult<OfflineAck>;

    async fn refresh_invoice_from_gateway(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
    ) -> BillingResult<ObligationStatus>;
}

/// Payment Ledger backed by the marketplace REST API.
pub struct HttpPaymentLedger {
    http_client: Client,
    base_url: String,
}

impl HttpPaymentLedger {
    pub fn new(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl PaymentLedger for HttpPaymentLedger {
    async fn list_invoices(&self, owner: &OwnerContext) -> BillingResult<Vec<InvoiceRecord>> {
        let request = self
            .http_client
            .get(self.url("/invoices"))
            .bearer_auth(&owner.access_token);
        let body = send_json(request, "Payment ledger").await?;
        decode_list(body, "invoices")
    }

    async fn get_stats(&self, owner: &OwnerContext) -> BillingResult<PaymentStats> {
        let request = self
            .http_client
            .get(self.url("/payments/stats"))
            .bearer_auth(&owner.access_token);
        let body = send_json(request, "Payment ledger").await?;
        decode_object(unwrap_data(body))
    }

    async fn create_invoice_for_booking(
        &self,
        owner: &OwnerContext,
        booking_id: BookingId,
    ) -> BillingResult<InvoiceId> {
        let request = self
            .http_client
            .post(self.url(&format!("/bookings/{booking_id}/invoice")))
            .bearer_auth(&owner.access_token);
        let body = send_json_or(request, "Payment ledger", BillingError::InvoiceCreation).await?;

        let data = unwrap_data(body);
        data.get("id")
            .or_else(|| data.get("invoice_id"))
            .and_then(Value::as_i64)
            .map(InvoiceId)
            .ok_or_else(|| {
                BillingError::InvoiceCreation(
                    "Payment ledger did not return an invoice id.".to_string(),
                )
            })
    }

    async fn create_gateway_source(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
        method: &str,
        return_url: Option<&str>,
    ) -> BillingResult<GatewaySource> {
        let mut payload = json!({ "method": method });
        if let Some(return_url) = return_url {
            payload["return_url"] = Value::String(return_url.to_string());
        }
        let request = self
            .http_client
            .post(self.url(&format!("/invoices/{invoice_id}/gateway-source")))
            .bearer_auth(&owner.access_token)
            .json(&payload);
        let body = send_json_or(request, "Payment gateway", BillingError::Gateway).await?;
        parse_gateway_source(&body)
    }

    async fn create_offline_record(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
        record: &OfflinePaymentRecord,
    ) -> BillingResult<OfflineAck> {
        let request = self
            .http_client
            .post(self.url(&format!("/invoices/{invoice_id}/offline-payments")))
            .bearer_auth(&owner.access_token)
            .json(record);
        let body = send_json(request, "Payment ledger").await?;
        decode_object(unwrap_data(body))
    }

    async fn refresh_invoice_from_gateway(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
    ) -> BillingResult<ObligationStatus> {
        let request = self
            .http_client
            .post(self.url(&format!("/invoices/{invoice_id}/refresh")))
            .bearer_auth(&owner.access_token);
        let body = send_json_or(request, "Payment gateway", BillingError::Gateway).await?;
        unwrap_data(body)
            .get("status")
            .and_then(Value::as_str)
            .map(|status| ObligationStatus::from(status.to_string()))
            .ok_or_else(|| BillingError::Decode("Refresh response had no status.".to_string()))
    }
}

/// Sends a request and returns its JSON body; non-auth rejections become
/// [`BillingError::Network`].
pub(crate) async fn send_json(request: RequestBuilder, service: &str) -> BillingResult<Value> {
    send_json_or(request, service, BillingError::Network).await
}

pub(crate) async fn send_json_or(
    request: RequestBuilder,
    service: &str,
    rejected: fn(String) -> BillingError,
) -> BillingResult<Value> {
    let response = request.send().await.map_err(|e| {
        tracing::error!(service, error = %e, "Upstream request failed");
        if e.is_timeout() {
            BillingError::Network(format!("{service} request timed out."))
        } else {
            BillingError::Network(format!("{service} request failed."))
        }
    })?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .unwrap_or(json!({"error": "failed to parse response"}));

    if status.is_success() {
        return Ok(body);
    }

    let message = extract_error_message(&body);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BillingError::Auth(
            message.unwrap_or_else(|| "Credential missing or expired.".to_string()),
        ));
    }

    tracing::warn!(service, status = status.as_u16(), "Upstream rejected request");
    Err(rejected(
        message.unwrap_or_else(|| format!("{service} request failed ({status}).")),
    ))
}

/// Pulls a human-readable message out of the error payload shapes the ledger
/// and gateway use.
pub(crate) fn extract_error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.pointer("/errors/0/detail"),
        body.pointer("/errors/0/message"),
        body.pointer("/error/message"),
        body.get("message"),
        body.get("detail"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

fn parse_gateway_source(body: &Value) -> BillingResult<GatewaySource> {
    let data = body.get("data").unwrap_or(body);
    let checkout_url = [
        data.get("checkout_url"),
        data.pointer("/attributes/redirect/checkout_url"),
        data.pointer("/redirect/checkout_url"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .map(str::trim)
    .find(|url| !url.is_empty())
    .ok_or_else(|| {
        BillingError::Gateway(
            extract_error_message(body)
                .unwrap_or_else(|| "Payment gateway did not return a checkout URL.".to_string()),
        )
    })?;

    Ok(GatewaySource {
        checkout_url: checkout_url.to_string(),
        source_id: data.get("id").and_then(|id| {
            id.as_str()
                .map(ToOwned::to_owned)
                .or_else(|| id.as_i64().map(|n| n.to_string()))
        }),
    })
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode_object<T: DeserializeOwned>(body: Value) -> BillingResult<T> {
    serde_json::from_value(body)
        .map_err(|e| BillingError::Decode(format!("Unexpected payment ledger payload: {e}")))
}

/// Accepts a bare array, `{"data": [...]}`, or `{"<key>": [...]}`.
pub(crate) fn decode_list<T: DeserializeOwned>(body: Value, key: &str) -> BillingResult<Vec<T>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove(key)) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(BillingError::Decode(format!(
                    "Expected a list of {key} in response."
                )))
            }
        },
        _ => {
            return Err(BillingError::Decode(format!(
                "Expected a list of {key} in response."
            )))
        }
    };
    serde_json::from_value(Value::Array(items))
        .map_err(|e| BillingError::Decode(format!("Unexpected {key} payload: {e}")))
}

/// Accepts `YYYY-MM-DD` or any timestamp starting with one.
fn deserialize_lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.map(|value| value.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let date_part = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(serde::de::Error::custom)
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    auth::OwnerContext,
    config::AppConfig,
    error::{BillingError, BillingResult},
    services::{
        booking_directory::{Booking, BookingDirectory, BookingId, HttpBookingDirectory},
        clock::{SharedClock, SystemClock},
        notification_dedup::{
            FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, NotificationSeenStore,
        },
        payment_ledger::{
            GatewaySource, HttpPaymentLedger, InvoiceId, InvoiceRecord, OfflineAck,
            OfflinePaymentRecord, PaymentLedger, PaymentStats,
        },
        payment_overview::PaymentOverviewService,
        reconciliation::ObligationStatus,
        settlement::SettlementDispatcher,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger_configured: bool,
    pub key_value_store: Arc<dyn KeyValueStore>,
    pub overview: Arc<PaymentOverviewService>,
    pub settlement: Arc<SettlementDispatcher>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_seconds.max(1)))
            .build()?;

        let (ledger, bookings): (Arc<dyn PaymentLedger>, Arc<dyn BookingDirectory>) =
            match config.ledger_api_base_url.as_deref() {
                Some(base_url) => (
                    Arc::new(HttpPaymentLedger::new(http_client.clone(), base_url)),
                    Arc::new(HttpBookingDirectory::new(http_client.clone(), base_url)),
                ),
                None => {
                    tracing::warn!("LEDGER_API_BASE_URL is not set; payment endpoints will report the ledger as unavailable");
                    (Arc::new(UnconfiguredUpstream), Arc::new(UnconfiguredUpstream))
                }
            };

        let key_value_store: Arc<dyn KeyValueStore> = match config.seen_set_path.as_deref() {
            Some(path) => Arc::new(FileKeyValueStore::new(path)),
            None => {
                tracing::warn!("SEEN_SET_PATH is not set; due alerts will repeat after a restart");
                Arc::new(InMemoryKeyValueStore::default())
            }
        };

        Ok(Self::assemble(
            config,
            ledger,
            bookings,
            key_value_store,
            Arc::new(SystemClock),
        ))
    }

    pub fn assemble(
        config: AppConfig,
        ledger: Arc<dyn PaymentLedger>,
        bookings: Arc<dyn BookingDirectory>,
        key_value_store: Arc<dyn KeyValueStore>,
        clock: SharedClock,
    ) -> Self {
        let ledger_configured = config.ledger_api_base_url.is_some();
        let seen = Arc::new(NotificationSeenStore::new(key_value_store.clone()));
        let overview = Arc::new(PaymentOverviewService::new(
            bookings,
            ledger.clone(),
            seen,
            clock,
            config.billing_timezone,
        ));
        let settlement = Arc::new(SettlementDispatcher::new(
            ledger,
            config.gateway_return_url.clone(),
        ));

        Self {
            config: Arc::new(config),
            ledger_configured,
            key_value_store,
            overview,
            settlement,
        }
    }
}

/// Stand-in collaborator used when no ledger URL is configured.
struct UnconfiguredUpstream;

fn unconfigured<T>() -> BillingResult<T> {
    Err(BillingError::Network(
        "Payment ledger is not configured. Set LEDGER_API_BASE_URL.".to_string(),
    ))
}

#[async_trait]
impl BookingDirectory for UnconfiguredUpstream {
    async fn list_bookings(&self, _owner: &OwnerContext) -> BillingResult<Vec<Booking>> {
        unconfigured()
    }
}

#[async_trait]
impl PaymentLedger for UnconfiguredUpstream {
    async fn list_invoices(&self, _owner: &OwnerContext) -> BillingResult<Vec<InvoiceRecord>> {
        unconfigured()
    }

    async fn get_stats(&self, _owner: &OwnerContext) -> BillingResult<PaymentStats> {
        unconfigured()
    }

    async fn create_invoice_for_booking(
        &self,
        _owner: &OwnerContext,
        _booking_id: BookingId,
    ) -> BillingResult<InvoiceId> {
        unconfigured()
    }

    async fn create_gateway_source(
        &self,
        _owner: &OwnerContext,
        _invoice_id: InvoiceId,
        _method: &str,
        _return_url: Option<&str>,
    ) -> BillingResult<GatewaySource> {
        unconfigured()
    }

    async fn create_offline_record(
        &self,
        _owner: &OwnerContext,
        _invoice_id: InvoiceId,
        _record: &OfflinePaymentRecord,
    ) -> BillingResult<OfflineAck> {
        unconfigured()
    }

    async fn refresh_invoice_from_gateway(
        &self,
        _owner: &OwnerContext,
        _invoice_id: InvoiceId,
    ) -> BillingResult<ObligationStatus> {
        unconfigured()
    }
}

#[cfg(test)]
impl AppState {
    pub fn for_tests(
        ledger: Arc<dyn PaymentLedger>,
        bookings: Arc<dyn BookingDirectory>,
        clock: SharedClock,
    ) -> Self {
        let mut config = AppConfig::for_tests();
        config.ledger_api_base_url = Some("http://ledger.test".to_string());
        Self::assemble(
            config,
            ledger,
            bookings,
            Arc::new(InMemoryKeyValueStore::default()),
            clock,
        )
    }
}

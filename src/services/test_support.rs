//! In-memory collaborators shared by the engine tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::{
    auth::OwnerContext,
    error::{BillingError, BillingResult},
    services::{
        booking_directory::{Booking, BookingDirectory, BookingId},
        money::Money,
        payment_ledger::{
            GatewaySource, InvoiceId, InvoiceRecord, OfflineAck, OfflinePaymentRecord,
            PaymentLedger, PaymentStats,
        },
        reconciliation::{Obligation, ObligationId, ObligationSource, ObligationStatus},
    },
};

pub fn owner() -> OwnerContext {
    OwnerContext::new("test-token")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn remote_obligation(invoice_id: i64, booking_id: Option<i64>, amount: Money) -> Obligation {
    Obligation {
        id: ObligationId::for_invoice(InvoiceId(invoice_id)),
        source: ObligationSource::Remote,
        invoice_id: Some(InvoiceId(invoice_id)),
        booking_id: booking_id.map(BookingId),
        status: ObligationStatus::Unpaid,
        status_label: "unpaid".to_string(),
        amount,
        due_date: Some(date(2024, 6, 12)),
        description: None,
    }
}

pub fn synthetic_obligation(booking_id: i64, amount: Money) -> Obligation {
    Obligation {
        id: ObligationId::for_booking(BookingId(booking_id)),
        source: ObligationSource::Synthetic,
        invoice_id: None,
        booking_id: Some(BookingId(booking_id)),
        status: ObligationStatus::Unpaid,
        status_label: "Unpaid".to_string(),
        amount,
        due_date: Some(date(2024, 6, 10)),
        description: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    ListInvoices,
    Stats,
    CreateInvoice(BookingId),
    GatewaySource {
        invoice_id: InvoiceId,
        method: String,
        return_url: Option<String>,
    },
    OfflineRecord {
        invoice_id: InvoiceId,
        amount: Money,
        method: String,
        note: Option<String>,
    },
    Refresh(InvoiceId),
}

#[derive(Default)]
pub struct FakeLedger {
    invoices: Mutex<Vec<InvoiceRecord>>,
    list_failure: Mutex<Option<BillingError>>,
    stats_failure: Mutex<Option<BillingError>>,
    invoice_failure: Mutex<Option<String>>,
    gateway_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<LedgerCall>>,
}

impl FakeLedger {
    pub fn with_invoices(invoices: Vec<InvoiceRecord>) -> Self {
        let ledger = Self::default();
        *ledger.invoices.lock() = invoices;
        ledger
    }

    pub fn fail_list(&self, error: BillingError) {
        *self.list_failure.lock() = Some(error);
    }

    pub fn fail_stats(&self, error: BillingError) {
        *self.stats_failure.lock() = Some(error);
    }

    pub fn fail_invoice_creation(&self, message: &str) {
        *self.invoice_failure.lock() = Some(message.to_string());
    }

    pub fn fail_gateway(&self, message: &str) {
        *self.gateway_failure.lock() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: LedgerCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl PaymentLedger for FakeLedger {
    async fn list_invoices(&self, _owner: &OwnerContext) -> BillingResult<Vec<InvoiceRecord>> {
        self.record(LedgerCall::ListInvoices);
        match self.list_failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(self.invoices.lock().clone()),
        }
    }

    async fn get_stats(&self, _owner: &OwnerContext) -> BillingResult<PaymentStats> {
        self.record(LedgerCall::Stats);
        match self.stats_failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(PaymentStats {
                total_unpaid: Money::new(15000),
                unpaid_count: 2,
                ..PaymentStats::default()
            }),
        }
    }

    async fn create_invoice_for_booking(
        &self,
        _owner: &OwnerContext,
        booking_id: BookingId,
    ) -> BillingResult<InvoiceId> {
        self.record(LedgerCall::CreateInvoice(booking_id));
        match self.invoice_failure.lock().clone() {
            Some(message) => Err(BillingError::InvoiceCreation(message)),
            None => Ok(InvoiceId(5000 + booking_id.0)),
        }
    }

    async fn create_gateway_source(
        &self,
        _owner: &OwnerContext,
        invoice_id: InvoiceId,
        method: &str,
        return_url: Option<&str>,
    ) -> BillingResult<GatewaySource> {
        self.record(LedgerCall::GatewaySource {
            invoice_id,
            method: method.to_string(),
            return_url: return_url.map(ToOwned::to_owned),
        });
        match self.gateway_failure.lock().clone() {
            Some(message) => Err(BillingError::Gateway(message)),
            None => Ok(GatewaySource {
                checkout_url: format!("https://pay.example.com/{invoice_id}/{method}"),
                source_id: Some(format!("src_{invoice_id}")),
            }),
        }
    }

    async fn create_offline_record(
        &self,
        _owner: &OwnerContext,
        invoice_id: InvoiceId,
        record: &OfflinePaymentRecord,
    ) -> BillingResult<OfflineAck> {
        self.record(LedgerCall::OfflineRecord {
            invoice_id,
            amount: record.amount_minor,
            method: record.method.clone(),
            note: record.note.clone(),
        });
        Ok(OfflineAck {
            reference: Some(format!("off-{invoice_id}")),
            status: "pending_confirmation".to_string(),
        })
    }

    async fn refresh_invoice_from_gateway(
        &self,
        _owner: &OwnerContext,
        invoice_id: InvoiceId,
    ) -> BillingResult<ObligationStatus> {
        self.record(LedgerCall::Refresh(invoice_id));
        Ok(ObligationStatus::Paid)
    }
}

#[derive(Default)]
pub struct FakeBookings {
    bookings: Mutex<Vec<Booking>>,
    failure: Mutex<Option<BillingError>>,
}

impl FakeBookings {
    pub fn with_bookings(bookings: Vec<Booking>) -> Self {
        let directory = Self::default();
        *directory.bookings.lock() = bookings;
        directory
    }

    pub fn fail(&self, error: BillingError) {
        *self.failure.lock() = Some(error);
    }
}

#[async_trait]
impl BookingDirectory for FakeBookings {
    async fn list_bookings(&self, _owner: &OwnerContext) -> BillingResult<Vec<Booking>> {
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(self.bookings.lock().clone()),
        }
    }
}

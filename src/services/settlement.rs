use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    auth::OwnerContext,
    error::{BillingError, BillingResult},
    services::{
        payment_ledger::{InvoiceId, OfflinePaymentRecord, PaymentLedger},
        reconciliation::{Obligation, ObligationStatus},
    },
};

fn default_offline_method() -> String {
    "cash".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlementChannel {
    /// Online payment completed out-of-band through a gateway redirect.
    Gateway { method: String },
    /// Cash or other offline payment awaiting landlord confirmation.
    Offline {
        #[serde(default = "default_offline_method")]
        method: String,
        #[serde(default)]
        note: Option<String>,
    },
}

impl SettlementChannel {
    fn name(&self) -> &'static str {
        match self {
            Self::Gateway { .. } => "gateway",
            Self::Offline { .. } => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SettlementRequest {
    pub obligation: Obligation,
    pub channel: SettlementChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SettlementOutcome {
    GatewayRequested {
        invoice_id: InvoiceId,
        checkout_url: String,
        source_id: Option<String>,
    },
    OfflineRecorded {
        invoice_id: InvoiceId,
        reference: Option<String>,
        status: String,
    },
}

enum SettlementState {
    NeedsInvoice,
    HasInvoice(InvoiceId),
    Done(SettlementOutcome),
}

pub struct SettlementDispatcher {
    ledger: Arc<dyn PaymentLedger>,
    return_url: Option<String>,
}

impl SettlementDispatcher {
    pub fn new(ledger: Arc<dyn PaymentLedger>, return_url: Option<String>) -> Self {
        Self { ledger, return_url }
    }

    /// Runs one settlement attempt to its terminal state. Nothing here retries;
    /// the gateway step is not idempotent, so callers debounce the user action.
    pub async fn dispatch(
        &self,
        owner: &OwnerContext,
        request: SettlementRequest,
    ) -> BillingResult<SettlementOutcome> {
        let SettlementRequest {
            obligation,
            channel,
        } = request;
        validate_request(&obligation, &channel)?;

        let mut state = match obligation.invoice_id {
            Some(invoice_id) => SettlementState::HasInvoice(invoice_id),
            None => SettlementState::NeedsInvoice,
        };

        loop {
            state = match state {
                SettlementState::NeedsInvoice => {
                    SettlementState::HasInvoice(self.materialize_invoice(owner, &obligation).await?)
                }
                SettlementState::HasInvoice(invoice_id) => SettlementState::Done(
                    self.route(owner, invoice_id, &obligation, &channel).await?,
                ),
                SettlementState::Done(outcome) => {
                    tracing::info!(
                        obligation_id = %obligation.id,
                        channel = channel.name(),
                        "Settlement request handed off"
                    );
                    return Ok(outcome);
                }
            };
        }
    }

    /// Pulls the latest gateway status into the ledger invoice.
    pub async fn refresh_status(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
    ) -> BillingResult<ObligationStatus> {
        self.ledger
            .refresh_invoice_from_gateway(owner, invoice_id)
            .await
    }

    async fn materialize_invoice(
        &self,
        owner: &OwnerContext,
        obligation: &Obligation,
    ) -> BillingResult<InvoiceId> {
        let booking_id = obligation.booking_id.ok_or_else(|| {
            BillingError::InvoiceCreation(
                "Cannot create an invoice for an obligation without a booking.".to_string(),
            )
        })?;
        let invoice_id = self
            .ledger
            .create_invoice_for_booking(owner, booking_id)
            .await?;
        tracing::info!(%booking_id, %invoice_id, "Invoice materialized for booking");
        Ok(invoice_id)
    }

    async fn route(
        &self,
        owner: &OwnerContext,
        invoice_id: InvoiceId,
        obligation: &Obligation,
        channel: &SettlementChannel,
    ) -> BillingResult<SettlementOutcome> {
        match channel {
            SettlementChannel::Gateway { method } => {
                let return_url = self.return_url_for(invoice_id);
                let source = self
                    .ledger
                    .create_gateway_source(owner, invoice_id, method.trim(), return_url.as_deref())
                    .await
                    .inspect_err(|e| {
                        tracing::warn!(
                            %invoice_id,
                            method = method.as_str(),
                            error = %e,
                            "Gateway source request failed"
                        );
                    })?;
                Ok(SettlementOutcome::GatewayRequested {
                    invoice_id,
                    checkout_url: source.checkout_url,
                    source_id: source.source_id,
                })
            }
            SettlementChannel::Offline { method, note } => {
                // The amount comes from the caller's obligation snapshot; the
                // ledger re-checks it against the invoice before confirming.
                let record = OfflinePaymentRecord {
                    amount_minor: obligation.amount,
                    method: method.trim().to_string(),
                    note: note
                        .as_deref()
                        .map(str::trim)
                        .filter(|note| !note.is_empty())
                        .map(ToOwned::to_owned),
                };
                let ack = self
                    .ledger
                    .create_offline_record(owner, invoice_id, &record)
                    .await?;
                Ok(SettlementOutcome::OfflineRecorded {
                    invoice_id,
                    reference: ack.reference,
                    status: ack.status,
                })
            }
        }
    }

    fn return_url_for(&self, invoice_id: InvoiceId) -> Option<String> {
        let raw = self.return_url.as_deref()?;
        match Url::parse(raw) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("invoice_id", &invoice_id.to_string());
                Some(url.into())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed gateway return URL");
                None
            }
        }
    }
}

fn validate_request(obligation: &Obligation, channel: &SettlementChannel) -> BillingResult<()> {
    if !obligation.status.is_payable() {
        return Err(BillingError::Validation(format!(
            "Obligation {} is {} and cannot be paid.",
            obligation.id,
            String::from(obligation.status.clone())
        )));
    }
    if !obligation.amount.is_positive() {
        return Err(BillingError::Validation(
            "Obligation amount must be positive.".to_string(),
        ));
    }
    let method = match channel {
        SettlementChannel::Gateway { method } | SettlementChannel::Offline { method, .. } => method,
    };
    if method.trim().is_empty() {
        return Err(BillingError::Validation(
            "A payment method is required.".to_string(),
        ));
    }
    Ok(())
}

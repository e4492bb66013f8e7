use crate::application::directory::WalletDirectory;
use crate::domain::fees::{FeeBreakdown, FeeEngine};
use crate::domain::ports::PaymentStoreRef;
use crate::domain::protocol::{Grant, IncomingPayment, OutgoingPayment, Quote, WalletAddress};
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The ordered steps of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    ResolveRecipient,
    Quote,
    IncomingPayment,
    Grant,
    OutgoingPayment,
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStep::ResolveRecipient => "resolve-recipient",
            SessionStep::Quote => "quote",
            SessionStep::IncomingPayment => "incoming-payment",
            SessionStep::Grant => "grant",
            SessionStep::OutgoingPayment => "outgoing-payment",
        };
        f.write_str(s)
    }
}

/// Everything a completed session hands back. Callers observe either a full
/// set of ids or an error, never a partial one.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub outgoing_payment_id: String,
    pub quote_id: String,
    pub incoming_payment_id: String,
    pub grant_id: String,
    pub recipient_wallet: WalletAddress,
    pub fees: FeeBreakdown,
}

/// Orchestrates one transfer attempt: Quote, IncomingPayment, Grant and
/// OutgoingPayment in strict order, failing fast on the first broken step.
pub struct PaymentSession {
    directory: Arc<WalletDirectory>,
    payments: PaymentStoreRef,
}

impl PaymentSession {
    pub fn new(directory: Arc<WalletDirectory>, payments: PaymentStoreRef) -> Self {
        Self {
            directory,
            payments,
        }
    }

    pub async fn start(
        &self,
        sender: &WalletAddress,
        recipient_email: &str,
        amount: Decimal,
    ) -> Result<SessionResult> {
        // Fee validation happens before any object is built.
        let fees = FeeEngine::compute(amount)?;

        let recipient = self
            .directory
            .mint_recipient()
            .await
            .map_err(|e| step_failed(SessionStep::ResolveRecipient, e))?;

        let quote = Quote::new(sender, &recipient, fees.clone());
        self.payments
            .put_quote(quote.clone())
            .await
            .map_err(|e| step_failed(SessionStep::Quote, e))?;
        info!(quote_id = %quote.id, amount = %amount, "quote created");

        let incoming = IncomingPayment::new(&recipient, fees.recipient_receives);
        self.payments
            .put_incoming(incoming.clone())
            .await
            .map_err(|e| step_failed(SessionStep::IncomingPayment, e))?;
        info!(incoming_payment_id = %incoming.id, "incoming payment created");

        // Consent stub: requested and authorized in the same breath.
        let mut grant = Grant::request(sender);
        grant.authorize();
        self.payments
            .put_grant(grant.clone())
            .await
            .map_err(|e| step_failed(SessionStep::Grant, e))?;
        info!(grant_id = %grant.id, "grant authorized");

        let outgoing = OutgoingPayment::new(sender, &incoming, &quote);
        self.payments
            .put_outgoing(outgoing.clone())
            .await
            .map_err(|e| step_failed(SessionStep::OutgoingPayment, e))?;
        info!(
            outgoing_payment_id = %outgoing.id,
            recipient = %recipient.url,
            recipient_email,
            "outgoing payment created"
        );

        Ok(SessionResult {
            outgoing_payment_id: outgoing.id,
            quote_id: quote.id,
            incoming_payment_id: incoming.id,
            grant_id: grant.id,
            recipient_wallet: recipient,
            fees,
        })
    }
}

fn step_failed(step: SessionStep, source: TransferError) -> TransferError {
    match source {
        // InvalidAmount keeps its own kind; everything else is tagged with
        // the step that broke.
        e @ TransferError::InvalidAmount(_) => e,
        e => TransferError::PaymentStepFailed {
            step,
            reason: e.to_string(),
        },
    }
}

use crate::application::directory::WalletDirectory;
use crate::application::scheduler::SettlementScheduler;
use crate::application::session::PaymentSession;
use crate::domain::fees::FeeBreakdown;
use crate::domain::ports::{NetworkProbeRef, TransferStoreRef, UserStoreRef};
use crate::domain::protocol::PrincipalId;
use crate::domain::transfer::{NewTransfer, Transfer, TransferId, TransferStatus};
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub base_host: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            base_host: "https://ilp.interledger-test.dev".to_string(),
            min_amount: dec!(1),
            max_amount: dec!(10000),
        }
    }
}

/// What the request layer gets back right away; settlement finishes later.
#[derive(Debug, Clone)]
pub struct CreateTransferReceipt {
    pub transfer_id: TransferId,
    pub status: TransferStatus,
    pub fees: FeeBreakdown,
    pub outgoing_payment_id: String,
    pub estimated_completion: String,
}

/// The inbound boundary of the settlement core.
///
/// Takes a verified sender id from the identity collaborator, runs the
/// payment session, persists the transfer and hands settlement to the
/// background scheduler.
pub struct TransferService {
    users: UserStoreRef,
    transfers: TransferStoreRef,
    directory: Arc<WalletDirectory>,
    session: PaymentSession,
    scheduler: Arc<SettlementScheduler>,
    probe: Option<NetworkProbeRef>,
    config: TransferConfig,
}

impl TransferService {
    pub fn new(
        users: UserStoreRef,
        transfers: TransferStoreRef,
        directory: Arc<WalletDirectory>,
        session: PaymentSession,
        scheduler: Arc<SettlementScheduler>,
        config: TransferConfig,
    ) -> Self {
        Self {
            users,
            transfers,
            directory,
            session,
            scheduler,
            probe: None,
            config,
        }
    }

    /// Attaches an optional live-network probe. Probe failures never block
    /// the local flow.
    pub fn with_probe(mut self, probe: NetworkProbeRef) -> Self {
        self.probe = Some(probe);
        self
    }

    pub async fn create_transfer(
        &self,
        sender_id: u64,
        recipient_email: &str,
        recipient_name: &str,
        amount: Decimal,
    ) -> Result<CreateTransferReceipt> {
        if amount < self.config.min_amount || amount > self.config.max_amount {
            return Err(TransferError::InvalidAmount(format!(
                "amount {amount} outside [{}, {}] USD",
                self.config.min_amount, self.config.max_amount
            )));
        }

        let sender = self
            .users
            .get(sender_id)
            .await?
            .ok_or_else(|| TransferError::PrincipalNotFound(sender_id.to_string()))?;

        if let Some(probe) = &self.probe {
            match probe.probe().await {
                Ok(report) if report.connected => {
                    info!(network = %report.network, "live network reachable")
                }
                _ => debug!("live network unavailable, using local simulation"),
            }
        }

        let sender_wallet = self.directory.resolve(&PrincipalId::user(sender_id)).await?;
        let session = self
            .session
            .start(&sender_wallet, recipient_email, amount)
            .await?;
        let fees = session.fees.clone();

        let transfer = self
            .transfers
            .create(NewTransfer {
                sender_id,
                recipient_email: recipient_email.to_string(),
                recipient_name: recipient_name.to_string(),
                amount,
                currency: sender_wallet.asset_code.clone(),
                traditional_fee: fees.traditional_fee,
                our_fee: fees.our_fee,
                savings: fees.savings,
                outgoing_payment_id: session.outgoing_payment_id.clone(),
                sender_wallet_url: sender_wallet.url.clone(),
                recipient_wallet_url: session.recipient_wallet.url.clone(),
            })
            .await?;

        self.scheduler
            .schedule(transfer.id, &session.outgoing_payment_id)
            .await?;

        info!(
            transfer_id = %transfer.id,
            sender = %sender.email,
            amount = %amount,
            savings = %fees.savings,
            "transfer created"
        );

        Ok(CreateTransferReceipt {
            transfer_id: transfer.id,
            status: transfer.status,
            fees,
            outgoing_payment_id: session.outgoing_payment_id,
            estimated_completion: "2-5 minutes".to_string(),
        })
    }

    /// Fetches one transfer; only its sender may see it.
    pub async fn get_transfer(&self, id: TransferId, requester: u64) -> Result<Transfer> {
        match self.transfers.get(id).await? {
            Some(transfer) if transfer.sender_id == requester => Ok(transfer),
            // A foreign transfer looks identical to a missing one.
            _ => Err(TransferError::NotFound(id)),
        }
    }

    /// All transfers of one sender, newest first.
    pub async fn list_transfers(&self, requester: u64) -> Result<Vec<Transfer>> {
        self.transfers.list_by_sender(requester).await
    }
}

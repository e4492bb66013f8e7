use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential identifier assigned by the transfer store on creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TransferId(pub u64);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Processing,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferStatus::Processing => "processing",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The persisted, user-facing transfer record.
///
/// Created once by the service with its fees already computed; after that,
/// only the settlement scheduler mutates it (status and `completed_at`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub sender_id: u64,
    pub recipient_email: String,
    pub recipient_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransferStatus,
    pub traditional_fee: Decimal,
    pub our_fee: Decimal,
    pub savings: Decimal,
    pub outgoing_payment_id: String,
    pub sender_wallet_url: String,
    pub recipient_wallet_url: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Everything the store needs to create a transfer row. The store assigns
/// the id and the initial `processing` status.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub sender_id: u64,
    pub recipient_email: String,
    pub recipient_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub traditional_fee: Decimal,
    pub our_fee: Decimal,
    pub savings: Decimal,
    pub outgoing_payment_id: String,
    pub sender_wallet_url: String,
    pub recipient_wallet_url: String,
}

impl NewTransfer {
    /// Materializes the persisted row under the id the store picked.
    pub fn into_transfer(self, id: TransferId) -> Transfer {
        Transfer {
            id,
            sender_id: self.sender_id,
            recipient_email: self.recipient_email,
            recipient_name: self.recipient_name,
            amount: self.amount,
            currency: self.currency,
            status: TransferStatus::Processing,
            traditional_fee: self.traditional_fee,
            our_fee: self.our_fee,
            savings: self.savings,
            outgoing_payment_id: self.outgoing_payment_id,
            sender_wallet_url: self.sender_wallet_url,
            recipient_wallet_url: self.recipient_wallet_url,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

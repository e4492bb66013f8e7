use crate::domain::protocol::{
    Grant, IncomingPayment, OutgoingPayment, PrincipalId, Quote, WalletAddress,
};
use crate::domain::transfer::{NewTransfer, Transfer, TransferId, TransferStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the identity collaborator exposes about a registered user. The core
/// never checks credentials; it only needs the row to exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub email: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert(&self, user: UserRecord) -> Result<()>;
    async fn get(&self, id: u64) -> Result<Option<UserRecord>>;
}

/// Wallet rows, one per principal.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Inserts a new wallet row. Fails with `ConcurrencyConflict` when a row
    /// already exists for the owner (the uniqueness constraint the directory
    /// relies on).
    async fn create(&self, wallet: WalletAddress) -> Result<()>;
    async fn get(&self, owner: &PrincipalId) -> Result<Option<WalletAddress>>;
    async fn count(&self) -> Result<usize>;
}

/// Storage for the simulated protocol objects produced by a session.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn put_quote(&self, quote: Quote) -> Result<()>;
    async fn get_quote(&self, id: &str) -> Result<Option<Quote>>;
    async fn put_incoming(&self, payment: IncomingPayment) -> Result<()>;
    async fn put_grant(&self, grant: Grant) -> Result<()>;
    async fn put_outgoing(&self, payment: OutgoingPayment) -> Result<()>;
    async fn get_outgoing(&self, id: &str) -> Result<Option<OutgoingPayment>>;
}

/// The persisted transfer records.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Assigns the next id, stamps `processing`, and persists the row.
    async fn create(&self, new: NewTransfer) -> Result<Transfer>;
    async fn get(&self, id: TransferId) -> Result<Option<Transfer>>;
    /// Only the settlement scheduler calls this after creation.
    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
    /// Newest first.
    async fn list_by_sender(&self, sender_id: u64) -> Result<Vec<Transfer>>;
    async fn list_by_status(&self, status: TransferStatus) -> Result<Vec<Transfer>>;
}

/// One pending settlement: fire `transfer_id` at or after `fire_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementJob {
    pub transfer_id: TransferId,
    pub outgoing_payment_id: String,
    pub fire_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Durable settlement queue. Jobs survive a process restart so pending
/// completions are never lost.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Upserts by transfer id, so duplicate scheduling stays idempotent.
    async fn enqueue(&self, job: SettlementJob) -> Result<()>;
    async fn get(&self, id: TransferId) -> Result<Option<SettlementJob>>;
    /// Jobs whose `fire_at` has passed, oldest first.
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<SettlementJob>>;
    async fn remove(&self, id: TransferId) -> Result<()>;
    async fn pending(&self) -> Result<Vec<SettlementJob>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub connected: bool,
    pub network: String,
    pub message: String,
}

/// Optional check against a live payment network. Any failure falls back to
/// the local simulation; the probe must never block the payment flow.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn probe(&self) -> Result<ProbeReport>;
}

pub type UserStoreRef = Arc<dyn UserStore>;
pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type TransferStoreRef = Arc<dyn TransferStore>;
pub type ScheduleStoreRef = Arc<dyn ScheduleStore>;
pub type NetworkProbeRef = Arc<dyn NetworkProbe>;

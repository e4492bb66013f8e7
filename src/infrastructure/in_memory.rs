use crate::domain::ports::{
    PaymentStore, ScheduleStore, SettlementJob, TransferStore, UserRecord, UserStore, WalletStore,
};
use crate::domain::protocol::{
    Grant, IncomingPayment, OutgoingPayment, PrincipalId, Quote, WalletAddress,
};
use crate::domain::transfer::{NewTransfer, Transfer, TransferId, TransferStatus};
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Thread-safe in-memory user rows.
///
/// `Arc<RwLock<HashMap>>` for shared concurrent access, the same shape as the
/// other adapters here. Ideal for tests and the CLI's default mode.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<u64, UserRecord>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn upsert(&self, user: UserRecord) -> Result<()> {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: u64) -> Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }
}

/// In-memory wallet rows, unique per principal.
///
/// The write lock spans the existence check and the insert, which is what
/// makes the uniqueness constraint hold under concurrent minting.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<PrincipalId, WalletAddress>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn create(&self, wallet: WalletAddress) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(&wallet.owner) {
            return Err(TransferError::ConcurrencyConflict(
                wallet.owner.to_string(),
            ));
        }
        wallets.insert(wallet.owner.clone(), wallet);
        Ok(())
    }

    async fn get(&self, owner: &PrincipalId) -> Result<Option<WalletAddress>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(owner).cloned())
    }

    async fn count(&self) -> Result<usize> {
        let wallets = self.wallets.read().await;
        Ok(wallets.len())
    }
}

/// In-memory storage for the protocol objects of all sessions.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    quotes: Arc<RwLock<HashMap<String, Quote>>>,
    incoming: Arc<RwLock<HashMap<String, IncomingPayment>>>,
    grants: Arc<RwLock<HashMap<String, Grant>>>,
    outgoing: Arc<RwLock<HashMap<String, OutgoingPayment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn put_quote(&self, quote: Quote) -> Result<()> {
        self.quotes.write().await.insert(quote.id.clone(), quote);
        Ok(())
    }

    async fn get_quote(&self, id: &str) -> Result<Option<Quote>> {
        Ok(self.quotes.read().await.get(id).cloned())
    }

    async fn put_incoming(&self, payment: IncomingPayment) -> Result<()> {
        self.incoming
            .write()
            .await
            .insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn put_grant(&self, grant: Grant) -> Result<()> {
        self.grants.write().await.insert(grant.id.clone(), grant);
        Ok(())
    }

    async fn put_outgoing(&self, payment: OutgoingPayment) -> Result<()> {
        self.outgoing
            .write()
            .await
            .insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn get_outgoing(&self, id: &str) -> Result<Option<OutgoingPayment>> {
        Ok(self.outgoing.read().await.get(id).cloned())
    }
}

/// In-memory transfer rows with a sequential id counter.
#[derive(Default, Clone)]
pub struct InMemoryTransferStore {
    rows: Arc<RwLock<HashMap<TransferId, Transfer>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn create(&self, new: NewTransfer) -> Result<Transfer> {
        let id = TransferId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let transfer = new.into_transfer(id);
        let mut rows = self.rows.write().await;
        rows.insert(id, transfer.clone());
        Ok(transfer)
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut rows = self.rows.write().await;
        let transfer = rows.get_mut(&id).ok_or(TransferError::NotFound(id))?;
        transfer.status = status;
        transfer.completed_at = completed_at;
        Ok(())
    }

    async fn list_by_sender(&self, sender_id: u64) -> Result<Vec<Transfer>> {
        let rows = self.rows.read().await;
        let mut transfers: Vec<Transfer> = rows
            .values()
            .filter(|t| t.sender_id == sender_id)
            .cloned()
            .collect();
        // Ids are sequential, so descending id means newest first.
        transfers.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(transfers)
    }

    async fn list_by_status(&self, status: TransferStatus) -> Result<Vec<Transfer>> {
        let rows = self.rows.read().await;
        let mut transfers: Vec<Transfer> = rows
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        transfers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(transfers)
    }
}

/// In-memory settlement queue, keyed by transfer id.
#[derive(Default, Clone)]
pub struct InMemoryScheduleStore {
    jobs: Arc<RwLock<HashMap<TransferId, SettlementJob>>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn enqueue(&self, job: SettlementJob) -> Result<()> {
        self.jobs.write().await.insert(job.transfer_id, job);
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<SettlementJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<SettlementJob>> {
        let jobs = self.jobs.read().await;
        let mut due: Vec<SettlementJob> = jobs
            .values()
            .filter(|j| j.fire_at <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));
        Ok(due)
    }

    async fn remove(&self, id: TransferId) -> Result<()> {
        self.jobs.write().await.remove(&id);
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<SettlementJob>> {
        let jobs = self.jobs.read().await;
        let mut pending: Vec<SettlementJob> = jobs.values().cloned().collect();
        pending.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_transfer(sender_id: u64) -> NewTransfer {
        NewTransfer {
            sender_id,
            recipient_email: "a@b.com".to_string(),
            recipient_name: "A".to_string(),
            amount: dec!(500),
            currency: "USD".to_string(),
            traditional_fee: dec!(35.00),
            our_fee: dec!(4.00),
            savings: dec!(31.00),
            outgoing_payment_id: "outgoing_1_abc".to_string(),
            sender_wallet_url: "https://ilp.example/users/1".to_string(),
            recipient_wallet_url: "https://ilp.example/users/recipient_1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_wallet_store_uniqueness() {
        let store = InMemoryWalletStore::new();
        let owner = PrincipalId::user(1);
        let wallet = WalletAddress::for_principal(owner.clone(), "https://ilp.example");

        store.create(wallet.clone()).await.unwrap();
        let second = store.create(wallet).await;
        assert!(matches!(
            second,
            Err(TransferError::ConcurrencyConflict(_))
        ));
        assert_eq!(store.count().await.unwrap(), 1);

        let read = store.get(&owner).await.unwrap().unwrap();
        assert_eq!(read.url, "https://ilp.example/users/1");
    }

    #[tokio::test]
    async fn test_transfer_store_sequential_ids() {
        let store = InMemoryTransferStore::new();
        let first = store.create(new_transfer(1)).await.unwrap();
        let second = store.create(new_transfer(1)).await.unwrap();
        assert_eq!(first.id, TransferId(1));
        assert_eq!(second.id, TransferId(2));

        let listed = store.list_by_sender(1).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id, "newest first");
    }

    #[tokio::test]
    async fn test_transfer_store_update_status() {
        let store = InMemoryTransferStore::new();
        let transfer = store.create(new_transfer(1)).await.unwrap();

        let now = Utc::now();
        store
            .update_status(transfer.id, TransferStatus::Completed, Some(now))
            .await
            .unwrap();

        let read = store.get(transfer.id).await.unwrap().unwrap();
        assert_eq!(read.status, TransferStatus::Completed);
        assert_eq!(read.completed_at, Some(now));

        assert!(matches!(
            store
                .update_status(TransferId(999), TransferStatus::Failed, None)
                .await,
            Err(TransferError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_schedule_store_due_filtering() {
        let store = InMemoryScheduleStore::new();
        let now = Utc::now();
        let overdue = SettlementJob {
            transfer_id: TransferId(1),
            outgoing_payment_id: "outgoing_1".to_string(),
            fire_at: now - chrono::Duration::seconds(1),
            attempts: 0,
        };
        let future = SettlementJob {
            transfer_id: TransferId(2),
            outgoing_payment_id: "outgoing_2".to_string(),
            fire_at: now + chrono::Duration::seconds(60),
            attempts: 0,
        };
        store.enqueue(overdue.clone()).await.unwrap();
        store.enqueue(future).await.unwrap();

        let due = store.due(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].transfer_id, TransferId(1));
        assert_eq!(store.pending().await.unwrap().len(), 2);

        store.remove(TransferId(1)).await.unwrap();
        assert!(store.get(TransferId(1)).await.unwrap().is_none());
        assert_eq!(store.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_schedule_store_enqueue_is_upsert() {
        let store = InMemoryScheduleStore::new();
        let job = SettlementJob {
            transfer_id: TransferId(1),
            outgoing_payment_id: "outgoing_1".to_string(),
            fire_at: Utc::now(),
            attempts: 0,
        };
        store.enqueue(job.clone()).await.unwrap();
        store
            .enqueue(SettlementJob {
                attempts: 3,
                ..job
            })
            .await
            .unwrap();

        let pending = store.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 3);
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use remita::application::directory::WalletDirectory;
use remita::application::scheduler::{SchedulerConfig, SettlementScheduler};
use remita::application::service::{TransferConfig, TransferService};
use remita::application::session::PaymentSession;
use remita::domain::ports::{
    NetworkProbe, PaymentStore, ProbeReport, TransferStore, UserRecord, UserStore,
};
use remita::domain::protocol::{Grant, IncomingPayment, OutgoingPayment, Quote};
use remita::domain::transfer::{NewTransfer, Transfer, TransferId, TransferStatus};
use remita::error::{Result, TransferError};
use remita::infrastructure::in_memory::{
    InMemoryPaymentStore, InMemoryScheduleStore, InMemoryTransferStore, InMemoryUserStore,
    InMemoryWalletStore,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub const BASE_HOST: &str = "https://ilp.interledger-test.dev";

/// Millisecond-scale delays so settlement finishes within a test run.
pub fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        min_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(150),
        sweep_interval: Duration::from_millis(20),
        retry_backoff: Duration::from_millis(40),
    }
}

pub struct Harness {
    pub service: TransferService,
    pub scheduler: Arc<SettlementScheduler>,
    pub users: Arc<InMemoryUserStore>,
    pub wallets: Arc<InMemoryWalletStore>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub transfers: Arc<InMemoryTransferStore>,
    pub schedule: Arc<InMemoryScheduleStore>,
}

/// Builds a full in-memory stack with user 1 registered.
pub async fn harness() -> Harness {
    let users = Arc::new(InMemoryUserStore::new());
    let wallets = Arc::new(InMemoryWalletStore::new());
    let payments = Arc::new(InMemoryPaymentStore::new());
    let transfers = Arc::new(InMemoryTransferStore::new());
    let schedule = Arc::new(InMemoryScheduleStore::new());

    let directory = Arc::new(WalletDirectory::new(wallets.clone(), BASE_HOST));
    let session = PaymentSession::new(directory.clone(), payments.clone());
    let scheduler = Arc::new(SettlementScheduler::new(
        transfers.clone(),
        payments.clone(),
        schedule.clone(),
        fast_config(),
    ));
    let service = TransferService::new(
        users.clone(),
        transfers.clone(),
        directory,
        session,
        scheduler.clone(),
        TransferConfig::default(),
    );

    users
        .upsert(UserRecord {
            id: 1,
            email: "alice@example.com".to_string(),
        })
        .await
        .unwrap();

    Harness {
        service,
        scheduler,
        users,
        wallets,
        payments,
        transfers,
        schedule,
    }
}

/// Polls until the transfer is terminal or the timeout elapses.
pub async fn wait_for_terminal(
    transfers: &InMemoryTransferStore,
    id: TransferId,
    timeout: Duration,
) -> Transfer {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let transfer = transfers.get(id).await.unwrap().expect("transfer row");
        if transfer.status.is_terminal() || tokio::time::Instant::now() >= deadline {
            return transfer;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A payment store whose writes always fail, for abort-path tests.
#[derive(Default, Clone)]
pub struct FailingPaymentStore;

#[async_trait]
impl PaymentStore for FailingPaymentStore {
    async fn put_quote(&self, _quote: Quote) -> Result<()> {
        Err(TransferError::Persistence("payment store down".to_string()))
    }

    async fn get_quote(&self, _id: &str) -> Result<Option<Quote>> {
        Ok(None)
    }

    async fn put_incoming(&self, _payment: IncomingPayment) -> Result<()> {
        Err(TransferError::Persistence("payment store down".to_string()))
    }

    async fn put_grant(&self, _grant: Grant) -> Result<()> {
        Err(TransferError::Persistence("payment store down".to_string()))
    }

    async fn put_outgoing(&self, _payment: OutgoingPayment) -> Result<()> {
        Err(TransferError::Persistence("payment store down".to_string()))
    }

    async fn get_outgoing(&self, _id: &str) -> Result<Option<OutgoingPayment>> {
        Ok(None)
    }
}

/// Delegates to an in-memory transfer store but fails the first
/// `failures_left` status updates, for scheduler retry tests.
#[derive(Clone)]
pub struct FlakyTransferStore {
    pub inner: Arc<InMemoryTransferStore>,
    pub failures_left: Arc<AtomicU32>,
}

impl FlakyTransferStore {
    pub fn failing(inner: Arc<InMemoryTransferStore>, failures: u32) -> Self {
        Self {
            inner,
            failures_left: Arc::new(AtomicU32::new(failures)),
        }
    }
}

#[async_trait]
impl TransferStore for FlakyTransferStore {
    async fn create(&self, new: NewTransfer) -> Result<Transfer> {
        self.inner.create(new).await
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>> {
        self.inner.get(id).await
    }

    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TransferError::Persistence(
                "transfer store briefly down".to_string(),
            ));
        }
        self.inner.update_status(id, status, completed_at).await
    }

    async fn list_by_sender(&self, sender_id: u64) -> Result<Vec<Transfer>> {
        self.inner.list_by_sender(sender_id).await
    }

    async fn list_by_status(&self, status: TransferStatus) -> Result<Vec<Transfer>> {
        self.inner.list_by_status(status).await
    }
}

/// A probe that always fails, for fallback tests.
pub struct UnreachableProbe;

#[async_trait]
impl NetworkProbe for UnreachableProbe {
    async fn probe(&self) -> Result<ProbeReport> {
        Err(TransferError::Persistence(
            "network unreachable".to_string(),
        ))
    }
}

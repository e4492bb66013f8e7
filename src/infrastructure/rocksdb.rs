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
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for user rows.
pub const CF_USERS: &str = "users";
/// Column Family for wallet rows, keyed by principal.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for quotes.
pub const CF_QUOTES: &str = "quotes";
/// Column Family for incoming payments.
pub const CF_INCOMING: &str = "incoming_payments";
/// Column Family for grants.
pub const CF_GRANTS: &str = "grants";
/// Column Family for outgoing payments.
pub const CF_OUTGOING: &str = "outgoing_payments";
/// Column Family for transfer rows.
pub const CF_TRANSFERS: &str = "transfers";
/// Column Family for the settlement queue. This is what makes the
/// scheduler's pending completions survive a restart.
pub const CF_SCHEDULE: &str = "schedule";
/// Column Family for counters.
pub const CF_META: &str = "meta";

const NEXT_TRANSFER_ID_KEY: &[u8] = b"next_transfer_id";

/// A persistent store backing every port of the settlement core.
///
/// One RocksDB instance with a Column Family per record type and JSON
/// values. `Clone` shares the underlying `Arc<DB>`, so one opened store can
/// serve all the ports at once.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    // Serializes read-modify-write sequences (id counter, wallet create).
    id_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at `path`, ensuring all column
    /// families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [
            CF_USERS,
            CF_WALLETS,
            CF_QUOTES,
            CF_INCOMING,
            CF_GRANTS,
            CF_OUTGOING,
            CF_TRANSFERS,
            CF_SCHEDULE,
            CF_META,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| TransferError::Persistence(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            id_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| TransferError::Persistence(format!("column family {name} not found")))
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| TransferError::Persistence(format!("serialization error: {e}")))?;
        self.db
            .put_cf(&cf, key, bytes)
            .map_err(|e| TransferError::Persistence(e.to_string()))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        let bytes = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| TransferError::Persistence(e.to_string()))?;
        match bytes {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| TransferError::Persistence(format!("deserialization error: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for entry in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, bytes) = entry.map_err(|e| TransferError::Persistence(e.to_string()))?;
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| TransferError::Persistence(format!("deserialization error: {e}")))?;
            values.push(value);
        }
        Ok(values)
    }

    async fn next_transfer_id(&self) -> Result<TransferId> {
        let _guard = self.id_lock.lock().await;
        let cf = self.cf(CF_META)?;
        let current = self
            .db
            .get_cf(&cf, NEXT_TRANSFER_ID_KEY)
            .map_err(|e| TransferError::Persistence(e.to_string()))?
            .map(|bytes| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                u64::from_be_bytes(buf)
            })
            .unwrap_or(0);
        let next = current + 1;
        self.db
            .put_cf(&cf, NEXT_TRANSFER_ID_KEY, next.to_be_bytes())
            .map_err(|e| TransferError::Persistence(e.to_string()))?;
        Ok(TransferId(next))
    }
}

#[async_trait]
impl UserStore for RocksDbStore {
    async fn upsert(&self, user: UserRecord) -> Result<()> {
        self.put_json(CF_USERS, &user.id.to_be_bytes(), &user)
    }

    async fn get(&self, id: u64) -> Result<Option<UserRecord>> {
        self.get_json(CF_USERS, &id.to_be_bytes())
    }
}

#[async_trait]
impl WalletStore for RocksDbStore {
    async fn create(&self, wallet: WalletAddress) -> Result<()> {
        // The mutex serializes check-then-insert across writers.
        let _guard = self.id_lock.lock().await;
        let key = wallet.owner.as_str().as_bytes().to_vec();
        let existing: Option<WalletAddress> = self.get_json(CF_WALLETS, &key)?;
        if existing.is_some() {
            return Err(TransferError::ConcurrencyConflict(wallet.owner.to_string()));
        }
        self.put_json(CF_WALLETS, &key, &wallet)
    }

    async fn get(&self, owner: &PrincipalId) -> Result<Option<WalletAddress>> {
        self.get_json(CF_WALLETS, owner.as_str().as_bytes())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.scan_json::<WalletAddress>(CF_WALLETS)?.len())
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn put_quote(&self, quote: Quote) -> Result<()> {
        self.put_json(CF_QUOTES, quote.id.as_bytes(), &quote)
    }

    async fn get_quote(&self, id: &str) -> Result<Option<Quote>> {
        self.get_json(CF_QUOTES, id.as_bytes())
    }

    async fn put_incoming(&self, payment: IncomingPayment) -> Result<()> {
        self.put_json(CF_INCOMING, payment.id.as_bytes(), &payment)
    }

    async fn put_grant(&self, grant: Grant) -> Result<()> {
        self.put_json(CF_GRANTS, grant.id.as_bytes(), &grant)
    }

    async fn put_outgoing(&self, payment: OutgoingPayment) -> Result<()> {
        self.put_json(CF_OUTGOING, payment.id.as_bytes(), &payment)
    }

    async fn get_outgoing(&self, id: &str) -> Result<Option<OutgoingPayment>> {
        self.get_json(CF_OUTGOING, id.as_bytes())
    }
}

#[async_trait]
impl TransferStore for RocksDbStore {
    async fn create(&self, new: NewTransfer) -> Result<Transfer> {
        let id = self.next_transfer_id().await?;
        let transfer = new.into_transfer(id);
        self.put_json(CF_TRANSFERS, &id.0.to_be_bytes(), &transfer)?;
        Ok(transfer)
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>> {
        self.get_json(CF_TRANSFERS, &id.0.to_be_bytes())
    }

    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut transfer: Transfer = self
            .get_json(CF_TRANSFERS, &id.0.to_be_bytes())?
            .ok_or(TransferError::NotFound(id))?;
        transfer.status = status;
        transfer.completed_at = completed_at;
        self.put_json(CF_TRANSFERS, &id.0.to_be_bytes(), &transfer)
    }

    async fn list_by_sender(&self, sender_id: u64) -> Result<Vec<Transfer>> {
        let mut transfers: Vec<Transfer> = self
            .scan_json::<Transfer>(CF_TRANSFERS)?
            .into_iter()
            .filter(|t| t.sender_id == sender_id)
            .collect();
        transfers.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(transfers)
    }

    async fn list_by_status(&self, status: TransferStatus) -> Result<Vec<Transfer>> {
        let mut transfers: Vec<Transfer> = self
            .scan_json::<Transfer>(CF_TRANSFERS)?
            .into_iter()
            .filter(|t| t.status == status)
            .collect();
        transfers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(transfers)
    }
}

#[async_trait]
impl ScheduleStore for RocksDbStore {
    async fn enqueue(&self, job: SettlementJob) -> Result<()> {
        self.put_json(CF_SCHEDULE, &job.transfer_id.0.to_be_bytes(), &job)
    }

    async fn get(&self, id: TransferId) -> Result<Option<SettlementJob>> {
        self.get_json(CF_SCHEDULE, &id.0.to_be_bytes())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<SettlementJob>> {
        let mut due: Vec<SettlementJob> = self
            .scan_json::<SettlementJob>(CF_SCHEDULE)?
            .into_iter()
            .filter(|j| j.fire_at <= now)
            .collect();
        due.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));
        Ok(due)
    }

    async fn remove(&self, id: TransferId) -> Result<()> {
        let cf = self.cf(CF_SCHEDULE)?;
        self.db
            .delete_cf(&cf, id.0.to_be_bytes())
            .map_err(|e| TransferError::Persistence(e.to_string()))
    }

    async fn pending(&self) -> Result<Vec<SettlementJob>> {
        let mut pending = self.scan_json::<SettlementJob>(CF_SCHEDULE)?;
        pending.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_transfer() -> NewTransfer {
        NewTransfer {
            sender_id: 1,
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
    async fn test_transfer_id_counter_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");

        {
            let store = RocksDbStore::open(&path).unwrap();
            let first = TransferStore::create(&store, new_transfer()).await.unwrap();
            assert_eq!(first.id, TransferId(1));
        }

        let store = RocksDbStore::open(&path).unwrap();
        let second = TransferStore::create(&store, new_transfer()).await.unwrap();
        assert_eq!(second.id, TransferId(2));

        let recovered = TransferStore::get(&store, TransferId(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recovered.amount, dec!(500));
    }

    #[tokio::test]
    async fn test_schedule_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");

        let job = SettlementJob {
            transfer_id: TransferId(1),
            outgoing_payment_id: "outgoing_1_abc".to_string(),
            fire_at: Utc::now(),
            attempts: 0,
        };

        {
            let store = RocksDbStore::open(&path).unwrap();
            ScheduleStore::enqueue(&store, job.clone()).await.unwrap();
        }

        let store = RocksDbStore::open(&path).unwrap();
        let pending = ScheduleStore::pending(&store).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0], job);
    }

    #[tokio::test]
    async fn test_wallet_uniqueness() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(dir.path().join("db")).unwrap();

        let owner = PrincipalId::user(1);
        let wallet = WalletAddress::for_principal(owner.clone(), "https://ilp.example");
        WalletStore::create(&store, wallet.clone()).await.unwrap();
        assert!(matches!(
            WalletStore::create(&store, wallet).await,
            Err(TransferError::ConcurrencyConflict(_))
        ));
        assert_eq!(WalletStore::count(&store).await.unwrap(), 1);
    }
}

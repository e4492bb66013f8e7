use clap::Parser;
use miette::{IntoDiagnostic, Result};
use remita::application::directory::WalletDirectory;
use remita::application::scheduler::{SchedulerConfig, SettlementScheduler};
use remita::application::service::{TransferConfig, TransferService};
use remita::application::session::PaymentSession;
use remita::domain::ports::{
    PaymentStoreRef, ScheduleStoreRef, TransferStoreRef, UserRecord, UserStoreRef, WalletStoreRef,
};
use remita::infrastructure::in_memory::{
    InMemoryPaymentStore, InMemoryScheduleStore, InMemoryTransferStore, InMemoryUserStore,
    InMemoryWalletStore,
};
use remita::interfaces::csv::order_reader::OrderReader;
use remita::interfaces::csv::report_writer::ReportWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input transfer orders CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Base host for wallet address urls
    #[arg(long, default_value = "https://ilp.interledger-test.dev")]
    base_host: String,

    /// Lower bound of the settlement delay, in milliseconds
    #[arg(long, default_value_t = 3000)]
    settle_min_ms: u64,

    /// Upper bound of the settlement delay, in milliseconds
    #[arg(long, default_value_t = 5000)]
    settle_max_ms: u64,

    /// Sweep interval of the settlement loop, in milliseconds
    #[arg(long, default_value_t = 250)]
    sweep_ms: u64,
}

struct Stores {
    users: UserStoreRef,
    wallets: WalletStoreRef,
    payments: PaymentStoreRef,
    transfers: TransferStoreRef,
    schedule: ScheduleStoreRef,
}

fn in_memory_stores() -> Stores {
    Stores {
        users: Arc::new(InMemoryUserStore::new()),
        wallets: Arc::new(InMemoryWalletStore::new()),
        payments: Arc::new(InMemoryPaymentStore::new()),
        transfers: Arc::new(InMemoryTransferStore::new()),
        schedule: Arc::new(InMemoryScheduleStore::new()),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    use remita::infrastructure::rocksdb::RocksDbStore;

    match db_path {
        Some(path) => {
            let store = RocksDbStore::open(path).into_diagnostic()?;
            Ok(Stores {
                users: Arc::new(store.clone()),
                wallets: Arc::new(store.clone()),
                payments: Arc::new(store.clone()),
                transfers: Arc::new(store.clone()),
                schedule: Arc::new(store),
            })
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stores = open_stores(cli.db_path)?;

    let directory = Arc::new(WalletDirectory::new(stores.wallets, cli.base_host.clone()));
    let session = PaymentSession::new(directory.clone(), stores.payments.clone());
    let scheduler = Arc::new(SettlementScheduler::new(
        stores.transfers.clone(),
        stores.payments,
        stores.schedule,
        SchedulerConfig {
            min_delay: Duration::from_millis(cli.settle_min_ms),
            max_delay: Duration::from_millis(cli.settle_max_ms.max(cli.settle_min_ms)),
            sweep_interval: Duration::from_millis(cli.sweep_ms),
            ..SchedulerConfig::default()
        },
    ));
    let service = TransferService::new(
        stores.users.clone(),
        stores.transfers,
        directory,
        session,
        scheduler.clone(),
        TransferConfig {
            base_host: cli.base_host,
            ..TransferConfig::default()
        },
    );

    // Requeue anything a previous run left in flight, then start settling.
    scheduler.recover().await.into_diagnostic()?;
    let settlement_loop = scheduler.start();

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OrderReader::new(file);
    let mut created = Vec::new();
    for order_result in reader.orders() {
        match order_result {
            Ok(order) => {
                // The identity collaborator is seeded from the input file.
                stores
                    .users
                    .upsert(UserRecord {
                        id: order.sender,
                        email: order.sender_email.clone(),
                    })
                    .await
                    .into_diagnostic()?;
                match service
                    .create_transfer(
                        order.sender,
                        &order.recipient_email,
                        &order.recipient_name,
                        order.amount,
                    )
                    .await
                {
                    Ok(receipt) => created.push((receipt.transfer_id, order.sender)),
                    Err(e) => eprintln!("Error processing order: {e}"),
                }
            }
            Err(e) => eprintln!("Error reading order: {e}"),
        }
    }

    // Wait for the background settlements, bounded so a wedged store cannot
    // hang the CLI forever.
    let deadline =
        tokio::time::Instant::now() + Duration::from_millis(cli.settle_max_ms + 10_000);
    loop {
        let mut all_terminal = true;
        for (id, sender) in &created {
            let transfer = service.get_transfer(*id, *sender).await.into_diagnostic()?;
            if !transfer.status.is_terminal() {
                all_terminal = false;
                break;
            }
        }
        if all_terminal || tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(cli.sweep_ms)).await;
    }
    settlement_loop.abort();

    let mut transfers = Vec::new();
    for (id, sender) in &created {
        transfers.push(service.get_transfer(*id, *sender).await.into_diagnostic()?);
    }

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_transfers(&transfers).into_diagnostic()?;

    Ok(())
}

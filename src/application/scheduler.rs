use crate::domain::money::AssetAmount;
use crate::domain::ports::{
    PaymentStoreRef, ScheduleStoreRef, SettlementJob, TransferStoreRef,
};
use crate::domain::transfer::{TransferId, TransferStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Timing knobs for the settlement loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Lower bound of the completion delay.
    pub min_delay: Duration,
    /// Upper bound of the completion delay.
    pub max_delay: Duration,
    /// How often the background loop looks for due jobs.
    pub sweep_interval: Duration,
    /// Base backoff after a failed firing; doubles per attempt.
    pub retry_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(5),
            sweep_interval: Duration::from_millis(250),
            retry_backoff: Duration::from_secs(2),
        }
    }
}

/// Drives transfers from `processing` to a terminal state after a bounded
/// delay, independent of the request that created them.
///
/// Jobs are persisted through `ScheduleStore` before the creating request
/// returns, so a restart loses nothing: `recover` requeues orphaned
/// transfers and overdue jobs fire on the first sweep.
pub struct SettlementScheduler {
    transfers: TransferStoreRef,
    payments: PaymentStoreRef,
    schedule: ScheduleStoreRef,
    config: SchedulerConfig,
}

impl SettlementScheduler {
    pub fn new(
        transfers: TransferStoreRef,
        payments: PaymentStoreRef,
        schedule: ScheduleStoreRef,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            transfers,
            payments,
            schedule,
            config,
        }
    }

    /// Enqueues a completion job with a delay drawn uniformly from
    /// [min_delay, max_delay]. Returns the fire time.
    pub async fn schedule(
        &self,
        transfer_id: TransferId,
        outgoing_payment_id: &str,
    ) -> Result<DateTime<Utc>> {
        let min = self.config.min_delay.as_millis() as u64;
        let max = self.config.max_delay.as_millis() as u64;
        let delay_ms = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        let fire_at = Utc::now() + chrono::Duration::milliseconds(delay_ms as i64);

        self.schedule
            .enqueue(SettlementJob {
                transfer_id,
                outgoing_payment_id: outgoing_payment_id.to_string(),
                fire_at,
                attempts: 0,
            })
            .await?;
        debug!(%transfer_id, %fire_at, "settlement scheduled");
        Ok(fire_at)
    }

    /// Startup pass: every transfer still `processing` without a persisted
    /// job (a crash between create and enqueue) gets a fresh one. Overdue
    /// persisted jobs need nothing here; the first sweep picks them up.
    pub async fn recover(&self) -> Result<usize> {
        let processing = self
            .transfers
            .list_by_status(TransferStatus::Processing)
            .await?;
        let mut requeued = 0;
        for transfer in processing {
            if self.schedule.get(transfer.id).await?.is_none() {
                self.schedule(transfer.id, &transfer.outgoing_payment_id)
                    .await?;
                requeued += 1;
            }
        }
        if requeued > 0 {
            info!(requeued, "rescheduled orphaned transfers on startup");
        }
        Ok(requeued)
    }

    /// Spawns the background sweep loop.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(scheduler.config.sweep_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if let Err(e) = scheduler.sweep().await {
                    error!(error = %e, "settlement sweep failed");
                }
            }
        })
    }

    /// Fires every due job once. Failed firings are requeued with backoff;
    /// successful or no-op firings drop the job.
    pub async fn sweep(&self) -> Result<()> {
        let due = self.schedule.due(Utc::now()).await?;
        for job in due {
            match self.fire(&job).await {
                Ok(()) => self.schedule.remove(job.transfer_id).await?,
                Err(e) => {
                    let attempts = job.attempts + 1;
                    let backoff = self.config.retry_backoff
                        * 2u32.saturating_pow(job.attempts.min(6));
                    error!(
                        transfer_id = %job.transfer_id,
                        attempts,
                        error = %e,
                        "settlement firing failed, retrying with backoff"
                    );
                    self.schedule
                        .enqueue(SettlementJob {
                            fire_at: Utc::now()
                                + chrono::Duration::milliseconds(backoff.as_millis() as i64),
                            attempts,
                            ..job
                        })
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Applies exactly one state transition. Idempotent: a transfer already
    /// terminal (or gone) makes the job a no-op, never a rollback.
    async fn fire(&self, job: &SettlementJob) -> Result<()> {
        let Some(transfer) = self.transfers.get(job.transfer_id).await? else {
            debug!(transfer_id = %job.transfer_id, "job without transfer row, dropping");
            return Ok(());
        };
        if transfer.status.is_terminal() {
            debug!(transfer_id = %transfer.id, status = %transfer.status, "already settled");
            return Ok(());
        }

        if let Some(mut outgoing) = self.payments.get_outgoing(&job.outgoing_payment_id).await?
            && outgoing.complete(AssetAmount::usd(transfer.amount))
        {
            self.payments.put_outgoing(outgoing).await?;
        }

        self.transfers
            .update_status(transfer.id, TransferStatus::Completed, Some(Utc::now()))
            .await?;
        info!(transfer_id = %transfer.id, "transfer completed");
        Ok(())
    }
}

//! Sync Worker
//!
//! Long-running polling loop that drains the sync queue against the
//! marketplace. Jobs are processed strictly sequentially: the marketplace is
//! rate-limited per credential, and concurrent read-merge-write cycles on the
//! same channel product would race. Each job re-reads marketplace state, so
//! later jobs win on conflicting fields and duplicates converge to the same
//! absolute target.

use chrono::Duration as ChronoDuration;
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::WorkerConfig;
use crate::error::SyncError;
use crate::models::sync_job::Model as SyncJob;
use crate::repositories::SyncQueueRepository;
use crate::smartstore::SmartstoreClient;
use crate::smartstore::client::truncate_message;
use crate::smartstore::types::ChannelProduct;

/// Confirmation data from a completed stock push.
#[derive(Debug)]
struct JobOutcome {
    confirmed_stock: Option<i64>,
}

/// Background worker draining the sync queue.
pub struct SyncWorker {
    queue: SyncQueueRepository,
    client: Arc<SmartstoreClient>,
    config: WorkerConfig,
}

impl SyncWorker {
    pub fn new(db: DatabaseConnection, client: Arc<SmartstoreClient>, config: WorkerConfig) -> Self {
        Self {
            queue: SyncQueueRepository::new(db),
            client,
            config,
        }
    }

    /// Runs the polling loop until the shutdown token fires.
    ///
    /// Shutdown is checked between jobs: the in-flight job finishes or fails
    /// cleanly, unclaimed jobs stay pending. Jobs orphaned in `processing`
    /// by a previous crash are requeued once at startup.
    #[instrument(skip_all)]
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), SyncError> {
        info!(config = ?self.config, "Starting sync worker");

        let reaped = self
            .queue
            .requeue_stale_processing(ChronoDuration::seconds(
                self.config.stale_processing_seconds as i64,
            ))
            .await?;
        if reaped > 0 {
            warn!(reaped, "Requeued stale processing jobs from a previous run");
        }

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.drain_once(&shutdown).await {
                Ok(0) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(Duration::from_millis(self.config.idle_sleep_ms)) => {}
                    }
                }
                Ok(count) => {
                    debug!(count, "Processed sync job batch");
                }
                Err(err) => {
                    error!(error = %err, "Failed to poll sync queue");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(Duration::from_millis(self.config.idle_sleep_ms)) => {}
                    }
                }
            }
        }

        info!("Sync worker stopped");
        Ok(())
    }

    /// Claims one batch of pending jobs and processes them sequentially with
    /// the configured inter-job pacing. Returns the number of jobs claimed.
    pub async fn drain_once(&self, shutdown: &CancellationToken) -> Result<usize, SyncError> {
        let jobs = self.queue.claim_pending(self.config.claim_batch).await?;
        if jobs.is_empty() {
            return Ok(0);
        }

        let count = jobs.len();
        info!(count, "Claimed pending sync jobs");

        for job in jobs {
            if shutdown.is_cancelled() {
                break;
            }
            self.run_single_job(job).await;
            sleep(Duration::from_millis(self.config.job_delay_ms)).await;
        }

        Ok(count)
    }

    /// Processes a single job to a terminal state. Every failure is caught
    /// here and recorded on the job; nothing escapes to kill the loop.
    /// Failed jobs are terminal by design: operator review of `failed` rows
    /// is the remediation path, not automatic re-enqueue.
    #[instrument(skip(self), fields(job_id = %job.id, product_id = %job.product_id, target_stock = job.target_stock))]
    pub async fn run_single_job(&self, job: SyncJob) {
        let start = std::time::Instant::now();

        if let Err(err) = self.queue.mark_processing(job.id).await {
            error!(error = %err, "Failed to mark job processing, skipping");
            return;
        }

        match self.execute_job(&job).await {
            Ok(outcome) => {
                histogram!("sync_job_duration_seconds").record(start.elapsed().as_secs_f64());
                counter!("sync_jobs_succeeded_total").increment(1);
                info!(
                    requested_stock = job.target_stock,
                    confirmed_stock = outcome.confirmed_stock,
                    "Marketplace stock update applied"
                );
                if let Err(err) = self.queue.mark_done(job.id).await {
                    error!(error = %err, "Failed to mark job done");
                }
            }
            Err(err) => {
                counter!("sync_jobs_failed_total").increment(1);
                warn!(error = %err, "Sync job failed");
                let message = truncate_message(&err.to_string(), 500);
                if let Err(db_err) = self.queue.mark_failed(job.id, message).await {
                    error!(error = %db_err, "Failed to record job failure");
                }
            }
        }
    }

    async fn execute_job(&self, job: &SyncJob) -> Result<JobOutcome, SyncError> {
        // Fresh read per job; stale queue entries merge against current state.
        let mut product = self.client.get_channel_product(&job.smartstore_id).await?;

        plan_stock_update(
            &mut product,
            job.target_stock,
            job.smartstore_option_id,
            &job.smartstore_id,
        )?;

        let updated = self
            .client
            .update_channel_product_stock(&job.smartstore_id, &product)
            .await?;

        Ok(JobOutcome {
            confirmed_stock: updated.stock_quantity,
        })
    }
}

/// Mutates only the stock fields of a freshly-fetched channel product to
/// apply an absolute target, leaving everything else for verbatim echo.
///
/// - No managed options: the whole product's stock becomes the target.
/// - Variant job (option id present): only that option changes; siblings are
///   untouched and the product aggregate becomes the sum of all options.
/// - Product job over managed options: the target is distributed across
///   options proportionally to their current stock.
pub(crate) fn plan_stock_update(
    product: &mut ChannelProduct,
    target_stock: i64,
    option_id: Option<i64>,
    channel_product_id: &str,
) -> Result<(), SyncError> {
    let aggregate = match product.option_stocks_mut() {
        Some(options) if !options.is_empty() => match option_id {
            Some(option_id) => {
                let Some(option) = options.iter_mut().find(|o| o.id == option_id) else {
                    return Err(SyncError::OptionNotOnChannel {
                        channel_product_id: channel_product_id.to_string(),
                        option_id,
                    });
                };
                option.stock_quantity = target_stock;
                options.iter().map(|o| o.stock_quantity).sum()
            }
            None => {
                let current: Vec<i64> = options.iter().map(|o| o.stock_quantity).collect();
                let allocation = distribute_proportionally(&current, target_stock);
                for (option, allocated) in options.iter_mut().zip(allocation) {
                    option.stock_quantity = allocated;
                }
                target_stock
            }
        },
        // Unmanaged or empty option lists mean single-field stock.
        _ => target_stock,
    };

    product.origin_product.stock_quantity = aggregate;
    Ok(())
}

/// Splits a target across options proportionally to their current stock,
/// flooring each share and assigning the rounding remainder to the first
/// option so the sum equals the target exactly. A zero current total puts
/// the entire target on the first option.
pub(crate) fn distribute_proportionally(current: &[i64], target: i64) -> Vec<i64> {
    if current.is_empty() {
        return Vec::new();
    }

    let total: i64 = current.iter().sum();
    if total <= 0 {
        let mut allocation = vec![0; current.len()];
        allocation[0] = target;
        return allocation;
    }

    let mut allocation: Vec<i64> = current
        .iter()
        .map(|&stock| ((target as i128 * stock as i128) / total as i128) as i64)
        .collect();

    let allocated: i64 = allocation.iter().sum();
    allocation[0] += target - allocated;
    allocation
}

//! # Sync Queue Repository
//!
//! Persisted push queue for marketplace stock updates. The checkout flow
//! enqueues one job per affected (product, variant-or-none) line item right
//! after deducting local stock; the worker claims and terminally resolves
//! them. Jobs are never deleted.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::product;
use crate::models::product_variant;
use crate::models::sync_job::{ActiveModel, Column, Entity, JobStatus, Model};

/// Input for one queued stock push.
#[derive(Debug, Clone)]
pub struct NewSyncJob {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub smartstore_id: String,
    pub smartstore_option_id: Option<i64>,
    pub target_stock: i64,
}

impl NewSyncJob {
    /// Builds a job for one checkout line item following the granularity
    /// rule: a variant with a resolved marketplace option mapping enqueues at
    /// variant granularity with the variant's post-deduction stock; anything
    /// else falls back to product granularity with the product's stock.
    ///
    /// Returns `None` for products without a marketplace linkage, which are
    /// skipped by every sync path.
    pub fn for_line_item(
        product: &product::Model,
        variant: Option<&product_variant::Model>,
    ) -> Option<Self> {
        let smartstore_id = product.smartstore_product_id.clone()?;

        if let Some(variant) = variant {
            if let Some(option_id) = variant.smartstore_option_id {
                return Some(Self {
                    product_id: product.id,
                    variant_id: Some(variant.id),
                    smartstore_id,
                    smartstore_option_id: Some(option_id),
                    target_stock: variant.stock,
                });
            }
        }

        Some(Self {
            product_id: product.id,
            variant_id: None,
            smartstore_id,
            smartstore_option_id: None,
            target_stock: product.stock,
        })
    }
}

/// Repository for sync job queue operations.
pub struct SyncQueueRepository {
    db: DatabaseConnection,
}

impl SyncQueueRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts one pending job per input, preserving input order.
    pub async fn enqueue(&self, jobs: Vec<NewSyncJob>) -> Result<Vec<Model>, sea_orm::DbErr> {
        let now = Utc::now().fixed_offset();
        let mut inserted = Vec::with_capacity(jobs.len());

        for job in jobs {
            let model = ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(job.product_id),
                variant_id: Set(job.variant_id),
                smartstore_id: Set(job.smartstore_id),
                smartstore_option_id: Set(job.smartstore_option_id),
                target_stock: Set(job.target_stock),
                status: Set(JobStatus::Pending),
                message: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                processed_at: Set(None),
            }
            .insert(&self.db)
            .await?;

            info!(
                job_id = %model.id,
                product_id = %model.product_id,
                target_stock = model.target_stock,
                "Sync job enqueued"
            );
            inserted.push(model);
        }

        Ok(inserted)
    }

    /// Enqueue for the payment-success path: failures are logged and
    /// swallowed. The payment already succeeded and must stay successful;
    /// a lost job only delays convergence until the next pull.
    pub async fn enqueue_best_effort(&self, jobs: Vec<NewSyncJob>) {
        if jobs.is_empty() {
            return;
        }
        if let Err(err) = self.enqueue(jobs).await {
            warn!(error = %err, "Failed to enqueue sync jobs after checkout; marketplace push skipped");
        }
    }

    /// Reads pending jobs oldest-first, up to `limit`.
    pub async fn claim_pending(&self, limit: u64) -> Result<Vec<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(Column::Status.eq(JobStatus::Pending))
            .order_by_asc(Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
    }

    pub async fn mark_processing(&self, id: Uuid) -> Result<(), sea_orm::DbErr> {
        self.set_status(id, JobStatus::Processing, None, false).await
    }

    pub async fn mark_done(&self, id: Uuid) -> Result<(), sea_orm::DbErr> {
        self.set_status(id, JobStatus::Done, None, true).await
    }

    pub async fn mark_failed(&self, id: Uuid, message: String) -> Result<(), sea_orm::DbErr> {
        self.set_status(id, JobStatus::Failed, Some(message), true)
            .await
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: JobStatus,
        message: Option<String>,
        terminal: bool,
    ) -> Result<(), sea_orm::DbErr> {
        let mut job = ActiveModel {
            id: Set(id),
            status: Set(status),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };
        if let Some(message) = message {
            job.message = Set(Some(message));
        }
        if terminal {
            job.processed_at = Set(Some(Utc::now().fixed_offset()));
        }
        job.update(&self.db).await?;
        Ok(())
    }

    /// Requeues `processing` jobs whose last status transition is older than
    /// the cutoff, recovering work orphaned by a crashed worker. Staleness is
    /// measured from the claim (the transition into `processing`), not from
    /// creation, so a job that waited long in the queue is not reaped the
    /// moment it is picked up. Returns the number of jobs requeued.
    pub async fn requeue_stale_processing(
        &self,
        older_than: chrono::Duration,
    ) -> Result<u64, sea_orm::DbErr> {
        let cutoff = (Utc::now() - older_than).fixed_offset();

        let stale = Entity::find()
            .filter(Column::Status.eq(JobStatus::Processing))
            .filter(Column::UpdatedAt.lt(cutoff))
            .all(&self.db)
            .await?;

        let mut requeued = 0u64;
        for job in stale {
            warn!(job_id = %job.id, "Requeueing stale processing job");
            let mut active: ActiveModel = job.into();
            active.status = Set(JobStatus::Pending);
            active.updated_at = Set(Utc::now().fixed_offset());
            active.update(&self.db).await?;
            requeued += 1;
        }

        Ok(requeued)
    }
}

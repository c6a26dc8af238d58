//! SyncJob entity model
//!
//! A sync job records one pending stock push to the marketplace, created by
//! the checkout flow immediately after local stock deduction. Jobs carry an
//! absolute target stock, never a delta, so duplicates converge to the same
//! value. Rows are never deleted; terminal statuses are the audit trail.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_jobs")]
pub struct Model {
    /// Unique identifier for the sync job (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Local product this job pushes stock for
    pub product_id: Uuid,

    /// Local variant for variant-granularity jobs; NULL for whole-product jobs
    pub variant_id: Option<Uuid>,

    /// Marketplace channel-product id to push to
    pub smartstore_id: String,

    /// Marketplace option id for variant-granularity jobs
    pub smartstore_option_id: Option<i64>,

    /// Absolute post-deduction stock value to apply
    pub target_stock: i64,

    /// Current status of the job
    pub status: JobStatus,

    /// Failure message for terminally failed jobs
    pub message: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    /// Timestamp of the last status transition; staleness of `processing`
    /// jobs is measured from here, not from creation
    pub updated_at: DateTimeWithTimeZone,

    /// Timestamp when the job reached a terminal state
    pub processed_at: Option<DateTimeWithTimeZone>,
}

/// Lifecycle status of a sync job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum JobStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

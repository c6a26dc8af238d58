//! Migration to create the sync_jobs table.
//!
//! Sync jobs are the persisted push queue written by the checkout flow and
//! drained by the sync worker. Rows are never deleted; terminal statuses
//! (done, failed) double as an audit trail.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncJobs::ProductId).uuid().not_null())
                    .col(ColumnDef::new(SyncJobs::VariantId).uuid().null())
                    .col(ColumnDef::new(SyncJobs::SmartstoreId).text().not_null())
                    .col(
                        ColumnDef::new(SyncJobs::SmartstoreOptionId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::TargetStock)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SyncJobs::Message).text().null())
                    .col(
                        ColumnDef::new(SyncJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for claiming pending jobs oldest-first
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_jobs_status_created")
                    .table(SyncJobs::Table)
                    .col(SyncJobs::Status)
                    .col(SyncJobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_jobs_status_created").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
    ProductId,
    VariantId,
    SmartstoreId,
    SmartstoreOptionId,
    TargetStock,
    Status,
    Message,
    CreatedAt,
    UpdatedAt,
    ProcessedAt,
}

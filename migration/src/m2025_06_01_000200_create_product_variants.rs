//! Migration to create the product_variants table.
//!
//! Variants carry per-option stock plus the marketplace mapping triple
//! (origin product number, option id, channel product number). The composite
//! key (product_id, origin product number, option id) is the fast lookup path;
//! sku is the fallback matching key when the mapping is absent or stale.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductVariants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVariants::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ProductVariants::OptionName).text().not_null())
                    .col(ColumnDef::new(ProductVariants::Sku).text().null())
                    .col(
                        ColumnDef::new(ProductVariants::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::SmartstoreOriginProductNo)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::SmartstoreOptionId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::SmartstoreChannelProductNo)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_variants_product_id")
                            .from(ProductVariants::Table, ProductVariants::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite mapping key used by per-option reconciliation
        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_mapping")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::ProductId)
                    .col(ProductVariants::SmartstoreOriginProductNo)
                    .col(ProductVariants::SmartstoreOptionId)
                    .to_owned(),
            )
            .await?;

        // SKU fallback lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_product_sku")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::ProductId)
                    .col(ProductVariants::Sku)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_product_variants_mapping").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_variants_product_sku")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductVariants {
    Table,
    Id,
    ProductId,
    OptionName,
    Sku,
    Stock,
    SmartstoreOriginProductNo,
    SmartstoreOptionId,
    SmartstoreChannelProductNo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

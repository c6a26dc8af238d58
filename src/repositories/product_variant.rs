//! # Variant Repository
//!
//! SeaORM operations for product variants, including the composite-key and
//! SKU-fallback lookups used by per-option reconciliation and the mapping
//! self-heal write.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
};
use tracing::info;
use uuid::Uuid;

use crate::models::product_variant::{ActiveModel, Column, Entity, Model};

/// Repository for product variant database operations.
pub struct VariantRepository {
    db: DatabaseConnection,
}

impl VariantRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fast path: lookup by the composite mapping key.
    pub async fn find_by_mapping(
        &self,
        product_id: Uuid,
        origin_product_no: i64,
        option_id: i64,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(Column::ProductId.eq(product_id))
            .filter(Column::SmartstoreOriginProductNo.eq(origin_product_no))
            .filter(Column::SmartstoreOptionId.eq(option_id))
            .one(&self.db)
            .await
    }

    /// Fallback path: lookup by seller-managed code within the product.
    pub async fn find_by_sku(
        &self,
        product_id: Uuid,
        sku: &str,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(Column::ProductId.eq(product_id))
            .filter(Column::Sku.eq(sku))
            .one(&self.db)
            .await
    }

    /// Any stored origin product number among the product's variants; used
    /// when the fresh API response does not carry one.
    pub async fn any_origin_product_no(
        &self,
        product_id: Uuid,
    ) -> Result<Option<i64>, sea_orm::DbErr> {
        let variant = Entity::find()
            .filter(Column::ProductId.eq(product_id))
            .filter(Column::SmartstoreOriginProductNo.is_not_null())
            .limit(1)
            .one(&self.db)
            .await?;
        Ok(variant.and_then(|v| v.smartstore_origin_product_no))
    }

    /// Persists a marketplace mapping discovered via SKU fallback so future
    /// lookups take the composite-key path.
    pub async fn persist_mapping(
        &self,
        variant: Model,
        origin_product_no: Option<i64>,
        option_id: i64,
        channel_product_no: Option<i64>,
    ) -> Result<Model, sea_orm::DbErr> {
        info!(
            variant_id = %variant.id,
            option_id,
            origin_product_no,
            "Persisting marketplace mapping discovered via SKU fallback"
        );

        let mut active: ActiveModel = variant.into();
        active.smartstore_option_id = Set(Some(option_id));
        if origin_product_no.is_some() {
            active.smartstore_origin_product_no = Set(origin_product_no);
        }
        if channel_product_no.is_some() {
            active.smartstore_channel_product_no = Set(channel_product_no);
        }
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await
    }

    /// Overwrites the variant stock with the marketplace-authoritative value.
    pub async fn set_stock(&self, variant: Model, stock: i64) -> Result<Model, sea_orm::DbErr> {
        let mut active: ActiveModel = variant.into();
        active.stock = Set(stock);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await
    }
}

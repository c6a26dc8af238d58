//! # Product Repository
//!
//! SeaORM operations for local products on the sync paths.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::models::product::{ActiveModel, Column, Entity, Model, ProductStatus};

/// Repository for product database operations.
pub struct ProductRepository {
    db: DatabaseConnection,
}

impl ProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Products eligible for marketplace sync: linked to a channel product,
    /// status active or sold_out, not soft-deleted. Hidden products are a
    /// manual override and stay out of the pull paths.
    pub async fn eligible_for_sync(&self) -> Result<Vec<Model>, sea_orm::DbErr> {
        Entity::find()
            .filter(Column::SmartstoreProductId.is_not_null())
            .filter(
                Condition::any()
                    .add(Column::Status.eq(ProductStatus::Active))
                    .add(Column::Status.eq(ProductStatus::SoldOut)),
            )
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Overwrites stock and status from the marketplace-authoritative value.
    pub async fn set_stock_and_status(
        &self,
        product: Model,
        stock: i64,
        status: ProductStatus,
    ) -> Result<Model, sea_orm::DbErr> {
        let mut active: ActiveModel = product.into();
        active.stock = Set(stock);
        active.status = Set(status);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await
    }
}

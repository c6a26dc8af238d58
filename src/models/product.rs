//! Product entity model
//!
//! Local products carry their own stock ledger and an optional marketplace
//! linkage. Products without a `smartstore_product_id` are never touched by
//! the sync paths.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name of the product
    pub name: String,

    /// Local stock count for the whole product
    pub stock: i64,

    /// Sale status of the product
    pub status: ProductStatus,

    /// Marketplace channel-product id; NULL means not marketplace-synced
    pub smartstore_product_id: Option<String>,

    /// Soft-delete timestamp; set rows are excluded from sync
    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Sale status of a local product.
///
/// `hidden` is a manual operator override and is never auto-changed by stock
/// levels; `sold_out` and `active` flip based on stock deltas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "hidden")]
    Hidden,
    #[sea_orm(string_value = "sold_out")]
    SoldOut,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_variant::Entity")]
    ProductVariant,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! ProductVariant entity model
//!
//! Variants hold per-option stock and the marketplace option mapping. The
//! composite key (product_id, origin product no, option id) is the preferred
//! lookup path; `sku` is the fallback. A mapping discovered via SKU fallback
//! is persisted back onto the variant so later lookups take the fast path.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    /// Unique identifier for the variant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning product
    pub product_id: Uuid,

    /// Human-readable option label (e.g. "Red / XL")
    pub option_name: String,

    /// Seller-managed code; fallback matching key against the marketplace
    pub sku: Option<String>,

    /// Local stock count for this variant
    pub stock: i64,

    /// Marketplace origin product number (mapping key component)
    pub smartstore_origin_product_no: Option<i64>,

    /// Marketplace option-combination id (mapping key component)
    pub smartstore_option_id: Option<i64>,

    /// Marketplace channel product number
    pub smartstore_channel_product_no: Option<i64>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

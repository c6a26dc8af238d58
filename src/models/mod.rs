//! # Data Models
//!
//! SeaORM entity models for the stocksync database schema.

pub mod product;
pub mod product_variant;
pub mod sync_job;

pub use product::Entity as Product;
pub use product_variant::Entity as ProductVariant;
pub use sync_job::Entity as SyncJob;

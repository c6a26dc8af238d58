//! # Repository Layer
//!
//! Repository implementations encapsulating SeaORM operations for the
//! stocksync entities.

pub mod product;
pub mod product_variant;
pub mod sync_queue;

pub use product::ProductRepository;
pub use product_variant::VariantRepository;
pub use sync_queue::{NewSyncJob, SyncQueueRepository};

//! # Error Handling
//!
//! Crate-level error type for sync operations, classifying failures into the
//! taxonomy the worker and reconciler act on: configuration errors abort the
//! operation, transport errors were already retried by the client, business
//! and mapping errors are recorded per item and never abort a batch.

use thiserror::Error;
use uuid::Uuid;

use crate::smartstore::SmartstoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Smartstore(#[from] SmartstoreError),

    /// A marketplace option with no matching local variant, by composite key
    /// or SKU fallback.
    #[error("no local variant matches option {option_id} of product {product_id}")]
    UnmappedOption { product_id: Uuid, option_id: i64 },

    /// A variant-granularity job whose option id is absent from the freshly
    /// fetched channel product.
    #[error("option {option_id} not present on channel product {channel_product_id}")]
    OptionNotOnChannel {
        channel_product_id: String,
        option_id: i64,
    },

    /// Marketplace read yielded no product for an id we expected to resolve.
    #[error("marketplace returned no product for id {product_id}")]
    ProductNotReadable { product_id: String },
}

impl SyncError {
    /// Mapping errors are per-item; batches record them and continue.
    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            SyncError::UnmappedOption { .. } | SyncError::OptionNotOnChannel { .. }
        )
    }
}

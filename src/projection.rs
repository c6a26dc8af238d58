//! Status/availability projection.
//!
//! Derives product status transitions from stock deltas. `hidden` is a
//! manual operator override and is never auto-changed by stock level.

use crate::models::product::ProductStatus;

/// Next status after learning a product's authoritative stock value.
///
/// Stock 0 flips a visible product to `sold_out`; stock above 0 flips a
/// `sold_out` product back to `active`. All other combinations keep the
/// current status.
pub fn next_status(current: ProductStatus, new_stock: i64) -> ProductStatus {
    match current {
        ProductStatus::Hidden => ProductStatus::Hidden,
        ProductStatus::SoldOut if new_stock > 0 => ProductStatus::Active,
        ProductStatus::Active if new_stock <= 0 => ProductStatus::SoldOut,
        other => other,
    }
}

//! Test utilities for database and marketplace-client testing.
//!
//! Sets up in-memory SQLite databases with migrations applied, fixture
//! inserts for products and variants, and a client wired to a wiremock
//! server with fast retry timings.

use anyhow::Result;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;

use stocksync::config::{RateLimitConfig, SmartstoreConfig};
use stocksync::models::product::{self, ProductStatus};
use stocksync::models::product_variant;
use stocksync::smartstore::{SmartstoreClient, TokenManager};

/// Sets up an in-memory SQLite database with all migrations applied.
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Retry policy with millisecond backoffs so rate-limit tests stay fast.
pub fn fast_retry() -> RateLimitConfig {
    RateLimitConfig {
        max_attempts: 3,
        backoff_min_ms: 10,
        backoff_max_ms: 20,
    }
}

/// Builds a client pointing at a mock server base URL.
#[allow(dead_code)]
pub fn mock_client(base_url: &str) -> Result<Arc<SmartstoreClient>> {
    let config = SmartstoreConfig {
        client_id: Some("test-client".to_string()),
        client_secret: Some("test-secret".to_string()),
        api_base: base_url.to_string(),
        ..SmartstoreConfig::default()
    };
    let tokens = TokenManager::new(&config, fast_retry())?;
    Ok(Arc::new(SmartstoreClient::new(
        base_url,
        Arc::new(tokens),
        fast_retry(),
    )))
}

/// Inserts a product linked to the given channel product id.
#[allow(dead_code)]
pub async fn insert_product(
    db: &DatabaseConnection,
    smartstore_id: Option<&str>,
    stock: i64,
    status: ProductStatus,
) -> Result<product::Model> {
    let now = Utc::now().fixed_offset();
    let model = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Test Product".to_string()),
        stock: Set(stock),
        status: Set(status),
        smartstore_product_id: Set(smartstore_id.map(str::to_string)),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Inserts a variant for the product, optionally carrying marketplace
/// mapping fields and a SKU.
#[allow(dead_code)]
pub async fn insert_variant(
    db: &DatabaseConnection,
    product_id: Uuid,
    sku: Option<&str>,
    stock: i64,
    origin_product_no: Option<i64>,
    option_id: Option<i64>,
) -> Result<product_variant::Model> {
    let now = Utc::now().fixed_offset();
    let model = product_variant::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        option_name: Set("Test Option".to_string()),
        sku: Set(sku.map(str::to_string)),
        stock: Set(stock),
        smartstore_origin_product_no: Set(origin_product_no),
        smartstore_option_id: Set(option_id),
        smartstore_channel_product_no: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}

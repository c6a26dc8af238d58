//! Database migrations for the stocksync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000100_create_products;
mod m2025_06_01_000200_create_product_variants;
mod m2025_06_01_000300_create_sync_jobs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000100_create_products::Migration),
            Box::new(m2025_06_01_000200_create_product_variants::Migration),
            Box::new(m2025_06_01_000300_create_sync_jobs::Migration),
        ]
    }
}

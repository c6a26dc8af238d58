//! Database connection and pool management.
//!
//! Initializes a SeaORM connection pool to Postgres with configurable
//! parameters and bounded retry on startup.

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::SyncError;

/// Initializes the database connection pool.
///
/// Retries transient connection failures with exponential backoff so a
/// worker restarted alongside its database comes up cleanly.
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection, SyncError> {
    if cfg.database_url.is_empty() {
        return Err(SyncError::Config(
            "database URL cannot be empty".to_string(),
        ));
    }

    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let max_retries = 5;
    let mut retry_delay = Duration::from_millis(100);

    let mut attempt = 0;
    loop {
        attempt += 1;
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                info!(attempt, "Connected to database");
                return Ok(conn);
            }
            Err(err) if attempt >= max_retries => {
                error!(attempt, error = %err, "Giving up on database connection");
                return Err(err.into());
            }
            Err(err) => {
                warn!(attempt, error = %err, delay = ?retry_delay, "Database connection failed, retrying");
                sleep(retry_delay).await;
                retry_delay *= 2;
            }
        }
    }
}

/// Verifies the connection is alive with a trivial query.
pub async fn health_check(db: &DatabaseConnection) -> Result<(), SyncError> {
    db.execute_unprepared("SELECT 1").await?;
    Ok(())
}

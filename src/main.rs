//! # Stocksync Main Entry Point
//!
//! CLI front door for the stock synchronization service: migrations, the
//! queue-draining worker, and the two pull reconciliation commands.

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use stocksync::config::ConfigLoader;
use stocksync::reconcile::StockReconciler;
use stocksync::smartstore::SmartstoreClient;
use stocksync::worker::SyncWorker;
use stocksync::{db, logging};

#[derive(Parser)]
#[command(name = "stocksync", version, about = "Stock synchronization between the local catalog and Naver Smartstore")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Run the queue-draining sync worker until interrupted
    Worker,
    /// Overwrite local product stock from the marketplace (whole-product)
    PullStock,
    /// Overwrite local variant stock from the marketplace (per-option)
    PullOptions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    logging::init_tracing(&config);
    if let Ok(redacted) = config.redacted_json() {
        info!(profile = %config.profile, config = %redacted, "Loaded configuration");
    }

    let db = db::init_pool(&config).await?;
    db::health_check(&db).await?;

    match cli.command {
        Command::Migrate => {
            Migrator::up(&db, None).await?;
            info!("Migrations applied");
        }
        Command::Worker => {
            let client = Arc::new(SmartstoreClient::from_config(&config)?);
            let worker = SyncWorker::new(db, client, config.worker.clone());

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                    signal_token.cancel();
                }
            });

            worker.run(shutdown).await?;
        }
        Command::PullStock => {
            let client = Arc::new(SmartstoreClient::from_config(&config)?);
            let reconciler = StockReconciler::new(db, client, config.reconcile.clone());
            let report = reconciler.pull_product_stock().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::PullOptions => {
            let client = Arc::new(SmartstoreClient::from_config(&config)?);
            let reconciler = StockReconciler::new(db, client, config.reconcile.clone());
            let report = reconciler.pull_option_stock().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

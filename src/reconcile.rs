//! Pull-side reconciliation.
//!
//! Periodically re-reads marketplace stock as the source of truth and
//! overwrites local values for every eligible product. One item's failure is
//! recorded and the walk continues; the report carries counters plus a
//! bounded sample of errors.

use metrics::counter;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ReconcileConfig;
use crate::error::SyncError;
use crate::models::product::Model as Product;
use crate::projection::next_status;
use crate::repositories::{ProductRepository, VariantRepository};
use crate::smartstore::SmartstoreClient;
use crate::smartstore::client::truncate_message;
use crate::smartstore::types::OptionCombination;

/// One failed item in a pull run.
#[derive(Debug, Clone, Serialize)]
pub struct PullItemError {
    pub product_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_id: Option<i64>,
    pub message: String,
}

/// Outcome of a full pull run. `failed` counts every failure; `errors` keeps
/// only the first few so the report stays printable for large catalogs.
#[derive(Debug, Default, Serialize)]
pub struct PullReport {
    pub synced: u64,
    pub failed: u64,
    pub errors: Vec<PullItemError>,
}

impl PullReport {
    fn record_failure(&mut self, max_errors: usize, error: PullItemError) {
        warn!(
            product_id = %error.product_id,
            option_id = error.option_id,
            message = %error.message,
            "Pull item failed"
        );
        self.failed += 1;
        if self.errors.len() < max_errors {
            self.errors.push(error);
        }
    }
}

/// Walks eligible products and overwrites local stock from the marketplace.
pub struct StockReconciler {
    products: ProductRepository,
    variants: VariantRepository,
    client: Arc<SmartstoreClient>,
    config: ReconcileConfig,
}

impl StockReconciler {
    pub fn new(
        db: DatabaseConnection,
        client: Arc<SmartstoreClient>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            products: ProductRepository::new(db.clone()),
            variants: VariantRepository::new(db),
            client,
            config,
        }
    }

    /// Product-level pull: one shallow read per product, local stock and
    /// status overwritten from the marketplace total.
    #[instrument(skip_all)]
    pub async fn pull_product_stock(&self) -> Result<PullReport, SyncError> {
        let products = self.products.eligible_for_sync().await?;
        info!(count = products.len(), "Starting product stock pull");

        let mut report = PullReport::default();
        for product in products {
            match self.pull_one_product(&product).await {
                Ok(()) => report.synced += 1,
                Err(err) => report.record_failure(
                    self.config.max_errors,
                    PullItemError {
                        product_id: product.id,
                        variant_id: None,
                        option_id: None,
                        message: truncate_message(&err.to_string(), 500),
                    },
                ),
            }
            sleep(Duration::from_millis(self.config.item_delay_ms)).await;
        }

        counter!("reconcile_products_synced_total").increment(report.synced);
        counter!("reconcile_products_failed_total").increment(report.failed);
        info!(synced = report.synced, failed = report.failed, "Product stock pull finished");
        Ok(report)
    }

    async fn pull_one_product(&self, product: &Product) -> Result<(), SyncError> {
        let Some(channel_id) = product.smartstore_product_id.as_deref() else {
            return Ok(());
        };

        let Some(summary) = self.client.get_product(channel_id).await? else {
            return Err(SyncError::ProductNotReadable {
                product_id: channel_id.to_string(),
            });
        };

        let stock = summary.stock_quantity;
        let status = next_status(product.status, stock);
        self.products
            .set_stock_and_status(product.clone(), stock, status)
            .await?;
        Ok(())
    }

    /// Option-level pull: one deep read per product, each marketplace option
    /// matched to a local variant by composite key with SKU fallback. An
    /// unmatched option is a per-item failure; matched siblings still sync.
    #[instrument(skip_all)]
    pub async fn pull_option_stock(&self) -> Result<PullReport, SyncError> {
        let products = self.products.eligible_for_sync().await?;
        info!(count = products.len(), "Starting option stock pull");

        let mut report = PullReport::default();
        for product in products {
            self.pull_product_options(&product, &mut report).await;
            sleep(Duration::from_millis(self.config.item_delay_ms)).await;
        }

        counter!("reconcile_options_synced_total").increment(report.synced);
        counter!("reconcile_options_failed_total").increment(report.failed);
        info!(synced = report.synced, failed = report.failed, "Option stock pull finished");
        Ok(report)
    }

    async fn pull_product_options(&self, product: &Product, report: &mut PullReport) {
        let Some(channel_id) = product.smartstore_product_id.as_deref() else {
            return;
        };

        let channel_product = match self.client.get_channel_product(channel_id).await {
            Ok(channel_product) => channel_product,
            Err(err) => {
                report.record_failure(
                    self.config.max_errors,
                    PullItemError {
                        product_id: product.id,
                        variant_id: None,
                        option_id: None,
                        message: truncate_message(&err.to_string(), 500),
                    },
                );
                return;
            }
        };

        let options = channel_product.option_stocks();
        if options.is_empty() {
            // Products without managed options are a no-op here; the
            // product-level pull covers them.
            report.synced += 1;
            return;
        }

        let origin_product_no = match channel_product.origin_product_no {
            Some(no) => Some(no),
            None => match self.variants.any_origin_product_no(product.id).await {
                Ok(no) => no,
                Err(err) => {
                    report.record_failure(
                        self.config.max_errors,
                        PullItemError {
                            product_id: product.id,
                            variant_id: None,
                            option_id: None,
                            message: truncate_message(&err.to_string(), 500),
                        },
                    );
                    return;
                }
            },
        };

        let channel_product_no = channel_product.channel_product_no;
        let options: Vec<OptionCombination> = options.to_vec();
        for option in &options {
            match self
                .pull_one_option(product, option, origin_product_no, channel_product_no)
                .await
            {
                Ok(()) => report.synced += 1,
                Err(error) => report.record_failure(self.config.max_errors, error),
            }
        }
    }

    /// Matches one marketplace option to a local variant and overwrites its
    /// stock. Failures carry the matched variant id when one was resolved
    /// before the failure, so the report pinpoints the row for triage.
    async fn pull_one_option(
        &self,
        product: &Product,
        option: &OptionCombination,
        origin_product_no: Option<i64>,
        channel_product_no: Option<i64>,
    ) -> Result<(), PullItemError> {
        let item_error = |variant_id: Option<Uuid>, message: String| PullItemError {
            product_id: product.id,
            variant_id,
            option_id: Some(option.id),
            message: truncate_message(&message, 500),
        };

        let variant = match origin_product_no {
            Some(origin_no) => self
                .variants
                .find_by_mapping(product.id, origin_no, option.id)
                .await
                .map_err(|err| item_error(None, err.to_string()))?,
            None => None,
        };

        let variant = match variant {
            Some(variant) => variant,
            None => {
                // Self-healing SKU fallback: match by seller-managed code and
                // persist the discovered mapping for the composite-key path.
                let sku = option.seller_manager_code.as_deref().filter(|s| !s.is_empty());
                let by_sku = match sku {
                    Some(sku) => self
                        .variants
                        .find_by_sku(product.id, sku)
                        .await
                        .map_err(|err| item_error(None, err.to_string()))?,
                    None => None,
                };
                match by_sku {
                    Some(variant) => {
                        let variant_id = variant.id;
                        self.variants
                            .persist_mapping(
                                variant,
                                origin_product_no,
                                option.id,
                                channel_product_no,
                            )
                            .await
                            .map_err(|err| item_error(Some(variant_id), err.to_string()))?
                    }
                    None => {
                        let err = SyncError::UnmappedOption {
                            product_id: product.id,
                            option_id: option.id,
                        };
                        return Err(item_error(None, err.to_string()));
                    }
                }
            }
        };

        let variant_id = variant.id;
        self.variants
            .set_stock(variant, option.stock_quantity)
            .await
            .map_err(|err| item_error(Some(variant_id), err.to_string()))?;
        Ok(())
    }
}

//! Typed marketplace API client.
//!
//! Wraps the channel-product read and stock-update endpoints with bearer
//! auth, envelope normalization, and bounded 429 retry. Partial updates are
//! not supported upstream, so callers must read-before-write and send back
//! the full representation with only the stock fields changed.

use metrics::counter;
use rand::{Rng, thread_rng};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{AppConfig, RateLimitConfig};
use crate::smartstore::auth::TokenManager;
use crate::smartstore::types::{ChannelProduct, Envelope, ProductSummary, UpdatedStock};
use crate::smartstore::SmartstoreError;

/// Client for the Smartstore commerce API.
pub struct SmartstoreClient {
    http: reqwest::Client,
    api_base: String,
    tokens: Arc<TokenManager>,
    retry: RateLimitConfig,
}

impl SmartstoreClient {
    /// Builds a client and its token manager from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, SmartstoreError> {
        let tokens = TokenManager::new(&config.smartstore, config.rate_limit.clone())?;
        Ok(Self::new(
            &config.smartstore.api_base,
            Arc::new(tokens),
            config.rate_limit.clone(),
        ))
    }

    /// Builds a client around an existing token manager.
    pub fn new(api_base: &str, tokens: Arc<TokenManager>, retry: RateLimitConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            tokens,
            retry,
        }
    }

    fn channel_product_url(&self, channel_product_id: &str) -> String {
        format!(
            "{}/v2/products/channel-products/{}",
            self.api_base, channel_product_id
        )
    }

    /// Single-product read used by the whole-product pull.
    ///
    /// Returns `Ok(None)` on an API-level error so batch callers can record
    /// the item failure and continue; transport errors propagate.
    pub async fn get_product(
        &self,
        product_id: &str,
    ) -> Result<Option<ProductSummary>, SmartstoreError> {
        let url = self.channel_product_url(product_id);
        let response = self.send_with_retry(|| self.http.get(&url)).await?;

        match Self::check(response).await {
            Ok(body) => {
                let envelope: Envelope<ChannelProduct> = serde_json::from_value(body)
                    .map_err(|e| SmartstoreError::Malformed(format!("product read: {}", e)))?;
                let product = envelope.into_inner();
                Ok(Some(ProductSummary {
                    stock_quantity: product.origin_product.stock_quantity,
                    sale_status: product.origin_product.sale_status.clone(),
                }))
            }
            Err(err) if err.is_business() => {
                warn!(product_id, error = %err, "Marketplace rejected product read");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Reads the full channel product, including nested option structure.
    pub async fn get_channel_product(
        &self,
        channel_product_id: &str,
    ) -> Result<ChannelProduct, SmartstoreError> {
        let url = self.channel_product_url(channel_product_id);
        let response = self.send_with_retry(|| self.http.get(&url)).await?;
        let body = Self::check(response).await?;

        let envelope: Envelope<ChannelProduct> = serde_json::from_value(body)
            .map_err(|e| SmartstoreError::Malformed(format!("channel product read: {}", e)))?;
        Ok(envelope.into_inner())
    }

    /// PUT-style full-object stock update.
    ///
    /// `body` must be the originally-fetched representation with only the
    /// stock fields mutated; everything else is echoed verbatim.
    pub async fn update_channel_product_stock(
        &self,
        channel_product_id: &str,
        body: &ChannelProduct,
    ) -> Result<UpdatedStock, SmartstoreError> {
        let url = self.channel_product_url(channel_product_id);
        let response = self
            .send_with_retry(|| self.http.put(&url).json(body))
            .await?;
        let response_body = Self::check(response).await?;

        debug!(channel_product_id, "Marketplace stock update accepted");
        Ok(UpdatedStock::from_response(&response_body))
    }

    /// Sends a request, retrying on HTTP 429 with a randomized backoff up to
    /// the bounded attempt count. Exhaustion surfaces as `RateLimited`.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, SmartstoreError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let token = self.tokens.access_token().await?;
            let response = build().bearer_auth(token).send().await?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            counter!("smartstore_rate_limited_total").increment(1);

            if attempt >= self.retry.max_attempts {
                warn!(attempt, "Marketplace rate limit retries exhausted");
                return Err(SmartstoreError::RateLimited { attempts: attempt });
            }

            let wait_ms =
                thread_rng().gen_range(self.retry.backoff_min_ms..=self.retry.backoff_max_ms);
            warn!(attempt, wait_ms, "Marketplace rate limited, backing off");
            sleep(std::time::Duration::from_millis(wait_ms)).await;
        }
    }

    /// Converts a non-2xx response into an API error with an extracted
    /// human-readable message; parses the JSON body of successful responses.
    async fn check(response: reqwest::Response) -> Result<Value, SmartstoreError> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text)
                .map_err(|e| SmartstoreError::Malformed(format!("response body: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SmartstoreError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            })
        }
    }
}

/// Extracts a human-readable message from an error body, which may be a
/// `{code, message}` envelope or raw text.
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let message = json
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        let code = json.get("code").and_then(Value::as_str).map(str::to_string);

        match (code, message) {
            (Some(code), Some(message)) => return format!("{} ({})", message, code),
            (None, Some(message)) => return message,
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        truncate_message(trimmed, 500)
    }
}

/// Caps a failure message to a bounded excerpt for job/report records.
pub(crate) fn truncate_message(message: &str, limit: usize) -> String {
    if message.len() <= limit {
        return message.to_string();
    }
    let mut end = limit;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &message[..end])
}

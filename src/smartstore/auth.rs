//! OAuth token management for the marketplace API.
//!
//! The commerce API hands out short-lived client-credentials tokens. The
//! manager caches the token and its expiry and only performs the exchange
//! when the remaining lifetime drops below the configured safety margin.
//! The provider-specific signed credential is produced by a pluggable
//! [`CredentialSigner`] strategy.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::{Rng, thread_rng};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{RateLimitConfig, SmartstoreConfig};
use crate::smartstore::SmartstoreError;

type HmacSha256 = Hmac<Sha256>;

/// Strategy producing the `client_secret_sign` form field.
///
/// The provider's exact signing scheme is an auth quirk of one marketplace,
/// so it lives behind a trait rather than being baked into the manager.
pub trait CredentialSigner: Send + Sync {
    fn sign(&self, client_id: &str, client_secret: &str, timestamp_ms: i64) -> String;
}

/// Default signer: base64 of HMAC-SHA256 over `{client_id}_{timestamp}`
/// keyed with the client secret.
pub struct HmacSha256Signer;

impl CredentialSigner for HmacSha256Signer {
    fn sign(&self, client_id: &str, client_secret: &str, timestamp_ms: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{}_{}", client_id, timestamp_ms).as_bytes());
        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Cached access-token provider for the marketplace API.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    account_type: String,
    account_id: Option<String>,
    safety_margin: Duration,
    retry: RateLimitConfig,
    signer: Box<dyn CredentialSigner>,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("account_type", &self.account_type)
            .field("account_id", &self.account_id)
            .field("safety_margin", &self.safety_margin)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Builds a manager from configuration with the default signer.
    pub fn new(config: &SmartstoreConfig, retry: RateLimitConfig) -> Result<Self, SmartstoreError> {
        Self::with_signer(config, retry, Box::new(HmacSha256Signer))
    }

    /// Builds a manager with a custom credential signer.
    pub fn with_signer(
        config: &SmartstoreConfig,
        retry: RateLimitConfig,
        signer: Box<dyn CredentialSigner>,
    ) -> Result<Self, SmartstoreError> {
        let (client_id, client_secret) = config
            .credentials()
            .map_err(|e| SmartstoreError::Config(e.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            token_url: format!("{}/v1/oauth2/token", config.api_base.trim_end_matches('/')),
            client_id,
            client_secret,
            account_type: config.account_type.clone(),
            account_id: config.account_id.clone(),
            safety_margin: Duration::seconds(config.token_safety_margin_seconds as i64),
            retry,
            signer,
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid access token, reusing the cache while the token has
    /// more than the safety margin of lifetime left.
    ///
    /// The cache lock is held across the exchange so concurrent callers get
    /// single-flight refresh semantics.
    pub async fn access_token(&self) -> Result<String, SmartstoreError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.expires_at - self.safety_margin {
                return Ok(token.token.clone());
            }
            debug!("Cached marketplace token inside safety margin, refreshing");
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn request_token(&self) -> Result<CachedToken, SmartstoreError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let timestamp_ms = Utc::now().timestamp_millis();
            let sign = self
                .signer
                .sign(&self.client_id, &self.client_secret, timestamp_ms);

            let mut form: HashMap<&str, String> = HashMap::new();
            form.insert("grant_type", "client_credentials".to_string());
            form.insert("client_id", self.client_id.clone());
            form.insert("client_secret", self.client_secret.clone());
            form.insert("timestamp", timestamp_ms.to_string());
            form.insert("client_secret_sign", sign);
            form.insert("type", self.account_type.clone());
            if let Some(account_id) = &self.account_id {
                form.insert("account_id", account_id.clone());
            }

            let response = self.http.post(&self.token_url).form(&form).send().await?;

            if response.status().as_u16() == 429 {
                if attempt >= self.retry.max_attempts {
                    return Err(SmartstoreError::RateLimited { attempts: attempt });
                }
                let wait_ms =
                    thread_rng().gen_range(self.retry.backoff_min_ms..=self.retry.backoff_max_ms);
                warn!(attempt, wait_ms, "Token endpoint rate limited, backing off");
                sleep(std::time::Duration::from_millis(wait_ms)).await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(SmartstoreError::Token(format!(
                    "status {}: {}",
                    status,
                    crate::smartstore::client::extract_error_message(&body)
                )));
            }

            let parsed: TokenResponse = response
                .json()
                .await
                .map_err(|e| SmartstoreError::Malformed(format!("token response: {}", e)))?;

            let expires_at = Utc::now() + Duration::seconds(parsed.expires_in);
            info!(expires_in = parsed.expires_in, "Obtained marketplace access token");

            return Ok(CachedToken {
                token: parsed.access_token,
                expires_at,
            });
        }
    }
}

//! Naver Smartstore marketplace integration.
//!
//! Typed client for the commerce API plus token management. All response
//! normalization happens at this boundary; downstream code never branches on
//! raw wire shapes.

use thiserror::Error;

pub mod auth;
pub mod client;
pub mod types;

pub use auth::{CredentialSigner, HmacSha256Signer, TokenManager};
pub use client::SmartstoreClient;
pub use types::{ChannelProduct, OptionCombination, ProductSummary, UpdatedStock};

/// Errors raised by the marketplace client and token manager.
#[derive(Debug, Error)]
pub enum SmartstoreError {
    #[error("missing credentials: {0}")]
    Config(String),

    #[error("token exchange failed: {0}")]
    Token(String),

    /// Non-2xx response carrying the extracted marketplace message.
    /// Business errors; not retried.
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// 429 budget exhausted after the bounded retry count.
    #[error("rate limited by marketplace API after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SmartstoreError {
    /// True for failures worth attributing to the external business layer
    /// rather than transport. Business rejections on batch reads are
    /// per-item outcomes, not call failures.
    pub fn is_business(&self) -> bool {
        matches!(self, SmartstoreError::Api { .. })
    }
}

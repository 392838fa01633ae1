//! Token store trait

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::entity::TokenRecord;

/// Errors returned by token stores
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenStoreError {
    #[error("token not found")]
    NotFound,

    #[error("token expired")]
    Expired,

    #[error("token record invalid: {0}")]
    Invalid(String),

    #[error("token store backend error: {0}")]
    Backend(String),
}

impl TokenStoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Semantic absence of a usable record, as opposed to an outage
    pub fn is_credential_denial(&self) -> bool {
        matches!(self, Self::NotFound | Self::Expired)
    }
}

/// Durable store of token records keyed by API key
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch a live record; expired records are reported and removed
    async fn get_token(&self, api_key: &str) -> Result<TokenRecord, TokenStoreError>;

    /// Validate and write a record, aligning backend expiry with the record
    async fn upsert(&self, record: TokenRecord) -> Result<(), TokenStoreError>;

    /// Remove a record
    async fn delete(&self, api_key: &str) -> Result<(), TokenStoreError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), TokenStoreError>;
}

//! Token record entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repository::TokenStoreError;

/// Authorization record keyed by API key
///
/// A record whose `rate_limit` is not positive is disabled no matter how far
/// away its expiry is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub api_key: String,
    pub rate_limit: i64,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub allowed_routes: Vec<String>,
}

impl TokenRecord {
    pub fn new(api_key: impl Into<String>, rate_limit: i64, expires_at: DateTime<Utc>) -> Self {
        Self {
            api_key: api_key.into(),
            rate_limit,
            expires_at,
            allowed_routes: Vec::new(),
        }
    }

    pub fn with_allowed_routes(mut self, routes: Vec<String>) -> Self {
        self.allowed_routes = routes;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.rate_limit > 0
    }

    /// True unless the expiry lies strictly after `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check the record before it is written to a store
    pub fn validate_for_upsert(&self, now: DateTime<Utc>) -> Result<(), TokenStoreError> {
        if self.api_key.is_empty() {
            return Err(TokenStoreError::invalid("empty api_key"));
        }

        if self.rate_limit <= 0 {
            return Err(TokenStoreError::invalid("rate_limit must be > 0"));
        }

        if self.expires_at.timestamp() == 0 {
            return Err(TokenStoreError::invalid("expires_at is required"));
        }

        if self.is_expired_at(now) {
            return Err(TokenStoreError::Expired);
        }

        Ok(())
    }
}

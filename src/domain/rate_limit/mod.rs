//! Rate limiting domain
//!
//! Fixed-window counting: every key gets one counter per aligned window,
//! created by the first increment and left to expire on its own.

mod window;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

pub use window::{counter_key, counter_ttl, window_start, COUNTER_TTL_PADDING, DEFAULT_WINDOW};

/// Errors returned by counter stores
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CounterError {
    #[error("window must be > 0 and fit the counter ttl")]
    InvalidWindow,

    #[error("counter backend error: {0}")]
    Backend(String),
}

/// Errors returned by rate limiters
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit: empty key")]
    EmptyKey,

    #[error("rate limit: limit must be > 0, got {0}")]
    InvalidLimit(i64),

    #[error("rate limit: failed to increment counter: {0}")]
    Counter(#[from] CounterError),
}

/// Shared per-key, per-window counter
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for the current window of `key`
    ///
    /// The first increment of a window sets the counter's expiry to
    /// `window + 1s`; later increments in the same window leave it alone.
    async fn incr(&self, key: &str, window: Duration) -> Result<i64, CounterError>;
}

/// Decides whether one more request fits under a limit
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn allow(&self, key: &str, limit: i64) -> Result<bool, RateLimitError>;
}

//! Fixed-window rate limiter

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::rate_limit::DEFAULT_WINDOW;
use crate::domain::{CounterStore, RateLimitError, RateLimiter};

/// Allows at most `limit` requests per key in each aligned window
///
/// Counts come from a shared [`CounterStore`], so every gateway instance
/// backed by the same store enforces one budget. A burst of up to twice the
/// limit is possible across a window boundary.
#[derive(Clone)]
pub struct FixedWindowRateLimiter {
    store: Arc<dyn CounterStore>,
    window: Duration,
}

impl std::fmt::Debug for FixedWindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowRateLimiter")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            window: DEFAULT_WINDOW,
        }
    }

    /// Sets the window length; zero keeps the default of 60 seconds
    pub fn with_window(mut self, window: Duration) -> Self {
        if !window.is_zero() {
            self.window = window;
        }
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn allow(&self, key: &str, limit: i64) -> Result<bool, RateLimitError> {
        if key.is_empty() {
            return Err(RateLimitError::EmptyKey);
        }
        if limit <= 0 {
            return Err(RateLimitError::InvalidLimit(limit));
        }

        let count = self.store.incr(key, self.window).await?;
        debug!(key = %key, count, limit, "current rate");

        Ok(count <= limit)
    }
}

//! In-memory counter store

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::domain::rate_limit::{counter_key, counter_ttl};
use crate::domain::{system_clock, Clock, CounterError, CounterStore};

use super::redis_counter::DEFAULT_RATE_PREFIX;

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    expires_at: DateTime<Utc>,
}

/// Process-local window counters
///
/// Only coordinates requests within one process. Expired counters are pruned
/// on every increment.
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<String, Counter>>,
    prefix: String,
    clock: Clock,
}

impl std::fmt::Debug for InMemoryCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCounterStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            prefix: DEFAULT_RATE_PREFIX.to_string(),
            clock: system_clock(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Number of live counters
    pub async fn len(&self) -> usize {
        self.counters.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.counters.lock().await.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> Result<i64, CounterError> {
        if window.is_zero() {
            return Err(CounterError::InvalidWindow);
        }

        let ttl = TimeDelta::from_std(counter_ttl(window)).map_err(|_| CounterError::InvalidWindow)?;
        let now = (self.clock)();
        let key = counter_key(&self.prefix, key, window, now);

        let mut counters = self.counters.lock().await;
        counters.retain(|_, counter| counter.expires_at > now);

        let counter = counters.entry(key).or_insert(Counter {
            count: 0,
            expires_at: now + ttl,
        });
        counter.count += 1;

        Ok(counter.count)
    }
}

//! Redis counter store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use crate::domain::rate_limit::{counter_key, counter_ttl};
use crate::domain::{system_clock, Clock, CounterError, CounterStore};

pub const DEFAULT_RATE_PREFIX: &str = "req_limit:";

/// Increment and set the expiry of a fresh counter in one round trip, so a
/// crash between the two can never leave a counter without a TTL.
const INCR_WITH_EXPIRY: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
end
return count
"#;

/// Window counters kept in Redis under `{prefix}{key}:{window_start}`
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    prefix: String,
    clock: Clock,
    script: Script,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("prefix", &self.prefix)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCounterStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            prefix: DEFAULT_RATE_PREFIX.to_string(),
            clock: system_clock(),
            script: Script::new(INCR_WITH_EXPIRY),
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
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> Result<i64, CounterError> {
        if window.is_zero() {
            return Err(CounterError::InvalidWindow);
        }

        let key = counter_key(&self.prefix, key, window, (self.clock)());
        let ttl_ms = i64::try_from(counter_ttl(window).as_millis())
            .map_err(|_| CounterError::InvalidWindow)?;
        let mut conn = self.connection.clone();

        let count: i64 = self
            .script
            .key(&key)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CounterError::Backend(format!("INCR {}: {}", key, e)))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::redis::{connect, RedisConfig};
    use redis::AsyncCommands;

    async fn connection() -> ConnectionManager {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        connect(&RedisConfig::new(url)).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_incr_counts_and_sets_ttl() {
        let prefix = format!("test-rate:{}:", uuid::Uuid::new_v4());
        let conn = connection().await;
        let store = RedisCounterStore::new(conn.clone()).with_prefix(prefix.clone());
        let window = Duration::from_secs(60);

        assert_eq!(store.incr("abc", window).await.unwrap(), 1);
        assert_eq!(store.incr("abc", window).await.unwrap(), 2);
        assert_eq!(store.incr("other", window).await.unwrap(), 1);

        let key = counter_key(&prefix, "abc", window, chrono::Utc::now());
        let mut conn = conn;
        let ttl: i64 = conn.pttl(&key).await.unwrap();
        assert!(ttl > 0 && ttl <= 61_000);
    }
}

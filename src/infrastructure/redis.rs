//! Shared Redis connection

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::Client;

use crate::domain::DomainError;

/// Connection settings for the Redis backend
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Open a managed connection and check it with a PING
///
/// The manager reconnects on its own and is cheap to clone, so the token
/// store and the counter store share one.
pub async fn connect(config: &RedisConfig) -> Result<ConnectionManager, DomainError> {
    let client = Client::open(config.url.as_str())
        .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

    let mut connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| {
            DomainError::storage(format!(
                "Timed out connecting to Redis after {:?}",
                config.connection_timeout
            ))
        })?
        .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

    let _: String = redis::cmd("PING")
        .query_async(&mut connection)
        .await
        .map_err(|e| DomainError::storage(format!("Redis ping failed: {}", e)))?;

    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = RedisConfig::new("redis://cache:6380")
            .with_connection_timeout(Duration::from_millis(250));

        assert_eq!(config.url, "redis://cache:6380");
        assert_eq!(config.connection_timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let result = connect(&RedisConfig::new("not-a-url")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_connect() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        assert!(connect(&RedisConfig::new(url)).await.is_ok());
    }
}

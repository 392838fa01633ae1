//! Redis token store

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

use super::fields::{decode_record, encode_record};
use crate::domain::{system_clock, Clock, TokenRecord, TokenStore, TokenStoreError};

pub const DEFAULT_TOKEN_PREFIX: &str = "token:";

/// Token records stored as Redis hashes under `{prefix}{api_key}`
///
/// Each hash carries a backend expiry equal to the record's `expires_at`, so
/// Redis drops records the gateway never reads again.
#[derive(Clone)]
pub struct RedisTokenStore {
    connection: ConnectionManager,
    prefix: String,
    clock: Clock,
}

impl fmt::Debug for RedisTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTokenStore")
            .field("prefix", &self.prefix)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisTokenStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            prefix: DEFAULT_TOKEN_PREFIX.to_string(),
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

    fn key(&self, api_key: &str) -> String {
        format!("{}{}", self.prefix, api_key)
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn get_token(&self, api_key: &str) -> Result<TokenRecord, TokenStoreError> {
        if api_key.is_empty() {
            return Err(TokenStoreError::invalid("empty api_key"));
        }

        let key = self.key(api_key);
        let mut conn = self.connection.clone();

        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| TokenStoreError::backend(format!("HGETALL {}: {}", key, e)))?;

        if fields.is_empty() {
            return Err(TokenStoreError::NotFound);
        }

        let record = decode_record(api_key, &fields)?;

        if record.is_expired_at((self.clock)()) {
            let deleted: Result<(), _> = conn.del(&key).await;
            if let Err(e) = deleted {
                warn!(key = %key, error = %e, "Failed to delete expired token record");
            } else {
                debug!(key = %key, "Deleted expired token record");
            }
            return Err(TokenStoreError::Expired);
        }

        Ok(record)
    }

    async fn upsert(&self, record: TokenRecord) -> Result<(), TokenStoreError> {
        record.validate_for_upsert((self.clock)())?;

        let key = self.key(&record.api_key);
        let fields = encode_record(&record)?;
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(&key, fields.as_slice())
            .ignore()
            .expire_at(&key, record.expires_at.timestamp())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| TokenStoreError::backend(format!("upsert {}: {}", key, e)))?;

        debug!(key = %key, expires_at = %record.expires_at, "Stored token record");

        Ok(())
    }

    async fn delete(&self, api_key: &str) -> Result<(), TokenStoreError> {
        if api_key.is_empty() {
            return Err(TokenStoreError::invalid("empty api_key"));
        }

        let key = self.key(api_key);
        let mut conn = self.connection.clone();

        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| TokenStoreError::backend(format!("DEL {}: {}", key, e)))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), TokenStoreError> {
        let mut conn = self.connection.clone();

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| TokenStoreError::backend(format!("PING: {}", e)))?;

        Ok(())
    }
}

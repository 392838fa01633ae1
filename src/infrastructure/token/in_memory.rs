//! In-memory token store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{system_clock, Clock, TokenRecord, TokenStore, TokenStoreError};

/// Process-local token store for single-instance deployments and tests
pub struct InMemoryTokenStore {
    records: RwLock<HashMap<String, TokenRecord>>,
    clock: Clock,
}

impl std::fmt::Debug for InMemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTokenStore").finish_non_exhaustive()
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

/// Drop `api_key` only if the entry present now is still expired. A fresh
/// record upserted between the read and the write lock survives.
fn remove_if_expired(
    records: &mut HashMap<String, TokenRecord>,
    api_key: &str,
    now: DateTime<Utc>,
) -> bool {
    if records.get(api_key).is_some_and(|record| record.is_expired_at(now)) {
        records.remove(api_key);
        return true;
    }
    false
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get_token(&self, api_key: &str) -> Result<TokenRecord, TokenStoreError> {
        if api_key.is_empty() {
            return Err(TokenStoreError::invalid("empty api_key"));
        }

        let record = {
            let records = self.records.read().await;
            records.get(api_key).cloned()
        };

        let now = (self.clock)();
        match record {
            None => Err(TokenStoreError::NotFound),
            Some(record) if record.is_expired_at(now) => {
                remove_if_expired(&mut *self.records.write().await, api_key, now);
                Err(TokenStoreError::Expired)
            }
            Some(record) => Ok(record),
        }
    }

    async fn upsert(&self, record: TokenRecord) -> Result<(), TokenStoreError> {
        record.validate_for_upsert((self.clock)())?;

        let mut records = self.records.write().await;
        records.insert(record.api_key.clone(), record);
        Ok(())
    }

    async fn delete(&self, api_key: &str) -> Result<(), TokenStoreError> {
        if api_key.is_empty() {
            return Err(TokenStoreError::invalid("empty api_key"));
        }

        self.records.write().await.remove(api_key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), TokenStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::{Arc, Mutex};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn movable_clock(start: DateTime<Utc>) -> (Clock, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(start));
        let handle = now.clone();
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, now)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = InMemoryTokenStore::new().with_clock(crate::domain::fixed_clock(noon()));
        let record = TokenRecord::new("abc", 5, noon() + Duration::hours(1));

        store.upsert(record.clone()).await.unwrap();

        assert_eq!(store.get_token("abc").await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.get_token("abc").await, Err(TokenStoreError::NotFound));
    }

    #[tokio::test]
    async fn test_empty_key_invalid() {
        let store = InMemoryTokenStore::new();
        assert!(matches!(store.get_token("").await, Err(TokenStoreError::Invalid(_))));
        assert!(matches!(store.delete("").await, Err(TokenStoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_expired_record_removed() {
        let (clock, now) = movable_clock(noon());
        let store = InMemoryTokenStore::new().with_clock(clock);
        store
            .upsert(TokenRecord::new("abc", 5, noon() + Duration::minutes(5)))
            .await
            .unwrap();

        *now.lock().unwrap() = noon() + Duration::minutes(5);

        assert_eq!(store.get_token("abc").await, Err(TokenStoreError::Expired));
        assert!(store.is_empty().await);
        assert_eq!(store.get_token("abc").await, Err(TokenStoreError::NotFound));
    }

    #[test]
    fn test_remove_if_expired_keeps_refreshed_record() {
        let now = noon() + Duration::minutes(5);
        let mut records = HashMap::new();
        records.insert(
            "abc".to_string(),
            TokenRecord::new("abc", 5, noon() + Duration::hours(1)),
        );

        assert!(!remove_if_expired(&mut records, "abc", now));
        assert!(records.contains_key("abc"));

        records.insert("abc".to_string(), TokenRecord::new("abc", 5, now));
        assert!(remove_if_expired(&mut records, "abc", now));
        assert!(records.is_empty());
        assert!(!remove_if_expired(&mut records, "abc", now));
    }

    #[tokio::test]
    async fn test_upsert_validates() {
        let store = InMemoryTokenStore::new().with_clock(crate::domain::fixed_clock(noon()));

        let disabled = TokenRecord::new("abc", 0, noon() + Duration::hours(1));
        assert!(matches!(store.upsert(disabled).await, Err(TokenStoreError::Invalid(_))));

        let past = TokenRecord::new("abc", 5, noon() - Duration::hours(1));
        assert_eq!(store.upsert(past).await, Err(TokenStoreError::Expired));

        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let store = InMemoryTokenStore::new().with_clock(crate::domain::fixed_clock(noon()));
        store
            .upsert(TokenRecord::new("abc", 5, noon() + Duration::hours(1)))
            .await
            .unwrap();
        store
            .upsert(TokenRecord::new("abc", 50, noon() + Duration::hours(2)))
            .await
            .unwrap();

        assert_eq!(store.get_token("abc").await.unwrap().rate_limit, 50);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryTokenStore::new().with_clock(crate::domain::fixed_clock(noon()));
        store
            .upsert(TokenRecord::new("abc", 5, noon() + Duration::hours(1)))
            .await
            .unwrap();

        store.delete("abc").await.unwrap();
        store.delete("abc").await.unwrap();

        assert_eq!(store.get_token("abc").await, Err(TokenStoreError::NotFound));
    }
}

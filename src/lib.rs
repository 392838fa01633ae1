//! Access gateway
//!
//! Sits in front of an upstream HTTP API and admits a request only when:
//! - it carries a signed bearer token with a known, enabled API key
//! - the request path is inside the token's route scope
//! - the key's fixed-window rate limit has room left
//!
//! Token records and rate counters live in Redis so any number of gateway
//! instances share one budget per key.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::{AppState, UpstreamProxy};
use config::StorageBackend;
use domain::{AccessPipeline, CounterStore, DomainError, TokenStore};
use infrastructure::auth::{JwtVerifier, KeySet};
use infrastructure::rate_limit::{
    FixedWindowRateLimiter, InMemoryCounterStore, RedisCounterStore,
};
use infrastructure::redis::{connect, RedisConfig};
use infrastructure::token::{InMemoryTokenStore, RedisTokenStore};
use tracing::info;

/// Token store and counter store selected by `storage.backend`
#[derive(Clone)]
pub struct Backends {
    pub token_store: Arc<dyn TokenStore>,
    pub counter_store: Arc<dyn CounterStore>,
}

pub async fn create_backends(config: &AppConfig) -> Result<Backends, DomainError> {
    let storage = &config.storage;

    match storage.backend {
        StorageBackend::Redis => {
            let redis_config = RedisConfig::new(storage.redis_url.clone())
                .with_connection_timeout(storage.connect_timeout());
            let connection = connect(&redis_config).await?;
            info!("Connected to Redis");

            Ok(Backends {
                token_store: Arc::new(
                    RedisTokenStore::new(connection.clone()).with_prefix(&storage.token_prefix),
                ),
                counter_store: Arc::new(
                    RedisCounterStore::new(connection).with_prefix(&storage.rate_prefix),
                ),
            })
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; limits are not shared between instances");

            let token_store = InMemoryTokenStore::new();
            for record in &storage.seed_tokens {
                token_store.upsert(record.clone()).await.map_err(|e| {
                    DomainError::configuration(format!(
                        "seed token {:?} rejected: {}",
                        record.api_key, e
                    ))
                })?;
            }
            info!(count = storage.seed_tokens.len(), "Seeded in-memory token store");

            Ok(Backends {
                token_store: Arc::new(token_store),
                counter_store: Arc::new(
                    InMemoryCounterStore::new().with_prefix(&storage.rate_prefix),
                ),
            })
        }
    }
}

/// Wire the pipeline, its collaborators and the upstream proxy
pub async fn create_app_state(config: &AppConfig) -> Result<AppState, DomainError> {
    let verifier = JwtVerifier::new(KeySet::from_config(&config.token)?);
    let backends = create_backends(config).await?;

    let limiter = FixedWindowRateLimiter::new(backends.counter_store.clone())
        .with_window(config.rate_limit.window());

    let pipeline = AccessPipeline::new(
        Arc::new(verifier),
        backends.token_store.clone(),
        Arc::new(limiter),
    )
    .with_store_timeout(config.storage.operation_timeout());

    let forwarder = UpstreamProxy::new(&config.upstream)?;

    Ok(AppState::new(pipeline, Arc::new(forwarder), backends.token_store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::domain::{Claims, TokenRecord};
    use crate::infrastructure::auth::JwtSigner;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.upstream.target_url = "http://localhost:9000".to_string();
        config.token.secret = "lib-test-secret".to_string();
        config
    }

    #[tokio::test]
    async fn test_create_app_state_with_memory_backend() {
        let state = create_app_state(&memory_config()).await.unwrap();
        assert!(state.token_store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_backend_serves_seeded_token() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/x"))
            .and(header_eq("x-gateway-api-key", "seeded"))
            .respond_with(ResponseTemplate::new(200).set_body_string("upstream"))
            .expect(1)
            .mount(&upstream)
            .await;

        let expires_at = Utc::now() + Duration::hours(1);
        let mut config = memory_config();
        config.upstream.target_url = upstream.uri();
        config.storage.seed_tokens = vec![
            TokenRecord::new("seeded", 5, expires_at).with_allowed_routes(vec!["*".to_string()]),
        ];

        let state = create_app_state(&config).await.unwrap();
        let app = api::create_router(state, &config.server);

        let token = JwtSigner::hmac("HS256", "lib-test-secret")
            .unwrap()
            .sign(&Claims::new("seeded", expires_at))
            .unwrap();
        let request = Request::builder()
            .uri("/api/v1/x")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unseeded_memory_backend_rejects_token() {
        let expires_at = Utc::now() + Duration::hours(1);
        let state = create_app_state(&memory_config()).await.unwrap();
        let app = api::create_router(state, &memory_config().server);

        let token = JwtSigner::hmac("HS256", "lib-test-secret")
            .unwrap()
            .sign(&Claims::new("seeded", expires_at))
            .unwrap();
        let request = Request::builder()
            .uri("/api/v1/x")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_seed_token_fails_startup() {
        let mut config = memory_config();
        config.storage.seed_tokens = vec![TokenRecord::new(
            "stale",
            5,
            Utc::now() - Duration::hours(1),
        )];

        let err = create_app_state(&config).await.err().unwrap();
        assert!(err.to_string().contains("stale"));
    }

    #[tokio::test]
    async fn test_create_app_state_rejects_missing_secret() {
        let mut config = memory_config();
        config.token.secret.clear();

        assert!(create_app_state(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_create_app_state_rejects_bad_upstream() {
        let mut config = memory_config();
        config.upstream.target_url = "not a url".to_string();

        assert!(create_app_state(&config).await.is_err());
    }
}

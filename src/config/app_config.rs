use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{DomainError, TokenRecord};
use crate::infrastructure::observability::ObservabilityConfig;

/// Prefix of environment variables overriding file configuration
pub const ENV_PREFIX: &str = "GATEWAY";

const HMAC_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];
const RSA_ALGORITHMS: [&str; 6] = ["RS256", "RS384", "RS512", "PS256", "PS384", "PS512"];

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Absolute base URL requests are forwarded to
    pub target_url: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

/// Bearer token verification material
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub algorithm: String,
    /// Shared secret for HMAC algorithms
    pub secret: String,
    /// PEM encoded public key for RSA algorithms
    pub public_key_pem: Option<String>,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("algorithm", &self.algorithm)
            .field("secret", &"[hidden]")
            .field("public_key_pem", &self.public_key_pem.as_ref().map(|_| "[hidden]"))
            .finish()
    }
}

impl TokenConfig {
    pub fn is_hmac(&self) -> bool {
        HMAC_ALGORITHMS.contains(&self.algorithm.to_uppercase().as_str())
    }

    pub fn is_rsa(&self) -> bool {
        RSA_ALGORITHMS.contains(&self.algorithm.to_uppercase().as_str())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub redis_url: String,
    /// Key prefix of token records
    pub token_prefix: String,
    /// Key prefix of rate counters
    pub rate_prefix: String,
    pub connect_timeout_secs: u64,
    /// Deadline for a single backing-store call made while authorizing
    pub operation_timeout_ms: u64,
    /// Records loaded into the memory backend at startup
    pub seed_tokens: Vec<TokenRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STORE_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 2000;
const DEFAULT_WINDOW_SECS: u64 = 60;
const MAX_WINDOW_SECS: u64 = 24 * 60 * 60;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            connect_timeout_secs: DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS,
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: String::new(),
            public_key_pem: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            token_prefix: "token:".to_string(),
            rate_prefix: "req_limit:".to_string(),
            connect_timeout_secs: DEFAULT_STORE_CONNECT_TIMEOUT_SECS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            seed_tokens: Vec::new(),
        }
    }
}

impl StorageConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default locations and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering sources from lowest to highest priority:
    /// `config/default`, `config/local`, the explicit `path`, then environment
    /// variables such as `GATEWAY_TOKEN__SECRET`
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject unusable settings and replace zero timeouts with defaults
    pub fn validate_and_normalize(&mut self) -> Result<(), DomainError> {
        if self.server.port == 0 {
            return Err(DomainError::configuration("server.port must be between 1 and 65535"));
        }

        if self.upstream.target_url.is_empty() {
            return Err(DomainError::configuration("upstream.target_url is required"));
        }

        match reqwest::Url::parse(&self.upstream.target_url) {
            Ok(url) if url.has_host() && matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(DomainError::configuration(
                    "upstream.target_url must be a valid absolute http(s) URL",
                ))
            }
        }

        if self.token.algorithm.is_empty() {
            return Err(DomainError::configuration("token.algorithm is required"));
        }

        if self.token.is_hmac() {
            if self.token.secret.is_empty() {
                return Err(DomainError::configuration(
                    "token.secret is required for HMAC algorithms",
                ));
            }
        } else if self.token.is_rsa() {
            if self.token.public_key_pem.as_deref().unwrap_or_default().is_empty() {
                return Err(DomainError::configuration(
                    "token.public_key_pem is required for RSA algorithms",
                ));
            }
        } else {
            return Err(DomainError::configuration(format!(
                "token.algorithm {:?} is not supported",
                self.token.algorithm
            )));
        }

        if self.storage.backend == StorageBackend::Redis {
            if self.storage.redis_url.is_empty() {
                return Err(DomainError::configuration("storage.redis_url is required"));
            }
            if !self.storage.seed_tokens.is_empty() {
                return Err(DomainError::configuration(
                    "storage.seed_tokens is only read by the memory backend; use `issue` for redis",
                ));
            }
        }

        if self.rate_limit.window_secs == 0 || self.rate_limit.window_secs > MAX_WINDOW_SECS {
            return Err(DomainError::configuration(format!(
                "rate_limit.window_secs must be between 1 and {}",
                MAX_WINDOW_SECS
            )));
        }

        self.observability.validate()?;

        if self.server.request_timeout_secs == 0 {
            self.server.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        if self.server.max_body_bytes == 0 {
            self.server.max_body_bytes = DEFAULT_MAX_BODY_BYTES;
        }
        if self.upstream.connect_timeout_secs == 0 {
            self.upstream.connect_timeout_secs = DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS;
        }
        if self.upstream.timeout_secs == 0 {
            self.upstream.timeout_secs = DEFAULT_UPSTREAM_TIMEOUT_SECS;
        }
        if self.storage.connect_timeout_secs == 0 {
            self.storage.connect_timeout_secs = DEFAULT_STORE_CONNECT_TIMEOUT_SECS;
        }
        if self.storage.operation_timeout_ms == 0 {
            self.storage.operation_timeout_ms = DEFAULT_OPERATION_TIMEOUT_MS;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.upstream.target_url = "http://localhost:9000".to_string();
        config.token.secret = "test-secret".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.token.algorithm, "HS256");
        assert_eq!(config.storage.backend, StorageBackend::Redis);
        assert_eq!(config.storage.token_prefix, "token:");
        assert_eq!(config.storage.rate_prefix, "req_limit:");
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = valid_config();
        assert!(config.validate_and_normalize().is_ok());
    }

    #[test]
    fn test_missing_target_rejected() {
        let mut config = valid_config();
        config.upstream.target_url.clear();

        assert!(config.validate_and_normalize().is_err());
    }

    #[test]
    fn test_relative_target_rejected() {
        let mut config = valid_config();
        config.upstream.target_url = "/backend".to_string();

        assert!(config.validate_and_normalize().is_err());
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let mut config = valid_config();
        config.token.algorithm = "none".to_string();

        let err = config.validate_and_normalize().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_hmac_requires_secret() {
        let mut config = valid_config();
        config.token.secret.clear();

        assert!(config.validate_and_normalize().is_err());
    }

    #[test]
    fn test_rsa_requires_public_key() {
        let mut config = valid_config();
        config.token.algorithm = "RS256".to_string();

        assert!(config.validate_and_normalize().is_err());

        config.token.public_key_pem = Some("-----BEGIN PUBLIC KEY-----".to_string());
        assert!(config.validate_and_normalize().is_ok());
    }

    #[test]
    fn test_algorithm_is_case_insensitive() {
        let mut config = valid_config();
        config.token.algorithm = "hs512".to_string();

        assert!(config.validate_and_normalize().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = valid_config();
        config.rate_limit.window_secs = 0;

        assert!(config.validate_and_normalize().is_err());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let mut config = valid_config();
        config.rate_limit.window_secs = u64::MAX;
        assert!(config.validate_and_normalize().is_err());

        config.rate_limit.window_secs = MAX_WINDOW_SECS + 1;
        assert!(config.validate_and_normalize().is_err());

        config.rate_limit.window_secs = MAX_WINDOW_SECS;
        assert!(config.validate_and_normalize().is_ok());
    }

    #[test]
    fn test_seed_tokens_need_memory_backend() {
        let mut config = valid_config();
        config.storage.seed_tokens = vec![TokenRecord::new(
            "seeded",
            5,
            chrono::Utc::now() + chrono::Duration::hours(1),
        )];
        assert!(config.validate_and_normalize().is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate_and_normalize().is_ok());
    }

    #[test]
    fn test_zero_timeouts_normalized() {
        let mut config = valid_config();
        config.server.request_timeout_secs = 0;
        config.storage.operation_timeout_ms = 0;
        config.upstream.timeout_secs = 0;

        config.validate_and_normalize().unwrap();

        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.storage.operation_timeout(), Duration::from_millis(2000));
        assert_eq!(config.upstream.timeout_secs, 30);
    }

    #[test]
    fn test_metrics_path_must_not_shadow_routes() {
        let mut config = valid_config();
        config.observability.metrics.path = "/health".to_string();
        assert!(config.validate_and_normalize().is_err());

        config.observability.metrics.path = "metrics".to_string();
        assert!(config.validate_and_normalize().is_err());

        config.observability.metrics.enabled = false;
        assert!(config.validate_and_normalize().is_ok());
    }

    #[test]
    fn test_memory_backend_skips_redis_url() {
        let mut config = valid_config();
        config.storage.backend = StorageBackend::Memory;
        config.storage.redis_url.clear();

        assert!(config.validate_and_normalize().is_ok());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = valid_config();
        let debug = format!("{:?}", config.token);

        assert!(!debug.contains("test-secret"));
        assert!(debug.contains("[hidden]"));
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let json = r#"{"upstream":{"target_url":"http://backend:80"},"storage":{"backend":"memory"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.upstream.target_url, "http://backend:80");
        assert_eq!(config.upstream.timeout_secs, 30);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.token_prefix, "token:");
    }

    #[test]
    fn test_deserialize_seed_tokens() {
        let json = r#"{"storage":{"backend":"memory","seed_tokens":[
            {"api_key":"local","rate_limit":100,"expires_at":"2030-01-01T00:00:00Z","allowed_routes":["*"]},
            {"api_key":"reports","rate_limit":5,"expires_at":"2030-01-01T00:00:00Z"}
        ]}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        let seeds = &config.storage.seed_tokens;
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].allowed_routes, vec!["*"]);
        assert_eq!(seeds[1].rate_limit, 5);
        assert!(seeds[1].allowed_routes.is_empty());
    }
}

//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, LogFormat, LoggingConfig, RateLimitSettings, ServerConfig, StorageBackend,
    StorageConfig, TokenConfig, UpstreamConfig, ENV_PREFIX,
};

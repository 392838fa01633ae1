//! Observability settings for the gateway process

use serde::Deserialize;

use crate::domain::DomainError;

pub const SERVICE_NAME: &str = "access-gateway";

const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Health routes the scrape endpoint may not take over
const RESERVED_PATHS: [&str; 3] = ["/health", "/ready", "/live"];
const PROXIED_PREFIX: &str = "/api/v1/";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.tracing.validate()?;
        self.metrics.validate()
    }
}

/// OpenTelemetry span export
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    /// OTLP gRPC collector, e.g. http://otel-collector:4317
    pub otlp_endpoint: String,
    pub service_name: String,
    /// Fraction of root spans kept, 0.0 to 1.0
    pub sampling_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: SERVICE_NAME.to_string(),
            sampling_ratio: 1.0,
        }
    }
}

impl TracingConfig {
    /// Export settings are only checked when export is switched on
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.enabled {
            return Ok(());
        }

        if !(0.0..=1.0).contains(&self.sampling_ratio) {
            return Err(DomainError::configuration(format!(
                "observability.tracing.sampling_ratio {} is outside 0.0..=1.0",
                self.sampling_ratio
            )));
        }

        if self.service_name.trim().is_empty() {
            return Err(DomainError::configuration(
                "observability.tracing.service_name is required",
            ));
        }

        match reqwest::Url::parse(&self.otlp_endpoint) {
            Ok(url) if url.has_host() && matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(DomainError::configuration(format!(
                "observability.tracing.otlp_endpoint {:?} is not an http(s) URL",
                self.otlp_endpoint
            ))),
        }
    }
}

/// Prometheus scrape endpoint, merged next to the health routes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl MetricsConfig {
    /// The scrape path must be absolute and clear of the health routes and the
    /// proxied prefix
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.path.as_str();
        if !path.starts_with('/') || RESERVED_PATHS.contains(&path) || path.starts_with(PROXIED_PREFIX)
        {
            return Err(DomainError::configuration(format!(
                "observability.metrics.path {:?} is not usable",
                self.path
            )));
        }

        Ok(())
    }
}

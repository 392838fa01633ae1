//! Access-control pipeline
//!
//! Checks run strictly in this order and the first failure wins:
//!
//! 1. extract the bearer credential
//! 2. verify signature and structure
//! 3. require a non-empty API key claim
//! 4. require the claim expiry to lie in the future
//! 5. enforce the route scope carried by the claims
//! 6. resolve the token record
//! 7. require the record to be enabled
//! 8. count the request against the record's rate limit
//!
//! A stage that is not reached never calls its collaborator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::bearer::extract_bearer;
use super::scope::is_path_allowed;
use crate::domain::auth::{Claims, ClaimsVerifier};
use crate::domain::clock::{system_clock, Clock};
use crate::domain::rate_limit::RateLimiter;
use crate::domain::token::{TokenRecord, TokenStore};

/// Deadline applied to each backing-store call when none is configured
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Backend that failed while a request was being evaluated
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InfrastructureFailure {
    #[error("token store unavailable: {0}")]
    TokenStore(String),

    #[error("rate limiter error: {0}")]
    RateLimiter(String),
}

/// Terminal rejection produced by the pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("path not allowed")]
    Forbidden,

    #[error("rate limit exceeded")]
    RateExceeded,

    #[error(transparent)]
    Infrastructure(#[from] InfrastructureFailure),
}

impl AccessDenied {
    fn missing(reason: impl Into<String>) -> Self {
        Self::MissingCredential(reason.into())
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCredential(reason.into())
    }

    /// Stable label for logs and metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "missing_credential",
            Self::InvalidCredential(_) => "invalid_credential",
            Self::Forbidden => "forbidden",
            Self::RateExceeded => "rate_exceeded",
            Self::Infrastructure(_) => "infrastructure_failure",
        }
    }

    /// Caller should re-authenticate
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::InvalidCredential(_))
    }
}

/// Ordered decision chain over the verifier, token store and rate limiter
#[derive(Clone)]
pub struct AccessPipeline {
    verifier: Arc<dyn ClaimsVerifier>,
    store: Arc<dyn TokenStore>,
    limiter: Arc<dyn RateLimiter>,
    clock: Clock,
    store_timeout: Duration,
}

impl std::fmt::Debug for AccessPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPipeline")
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl AccessPipeline {
    pub fn new(
        verifier: Arc<dyn ClaimsVerifier>,
        store: Arc<dyn TokenStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            verifier,
            store,
            limiter,
            clock: system_clock(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Deadline for each token-store and rate-limiter call
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Evaluate one request
    ///
    /// `authorization` is the raw `Authorization` header value, `path` the
    /// request path. Returns the verified claims on acceptance.
    pub async fn evaluate(
        &self,
        authorization: Option<&str>,
        path: &str,
    ) -> Result<Claims, AccessDenied> {
        let token = authorization
            .and_then(extract_bearer)
            .ok_or_else(|| AccessDenied::missing("missing bearer token"))?;

        let claims = self.verifier.parse(token).map_err(|e| {
            if e.is_configuration() {
                error!(error = %e, "Token verifier is misconfigured");
            }
            AccessDenied::invalid(e.to_string())
        })?;

        debug!(api_key = %claims.api_key, "Token parsed");

        if claims.api_key.is_empty() {
            return Err(AccessDenied::missing("missing api_key claim"));
        }

        if claims.is_expired_at((self.clock)()) {
            return Err(AccessDenied::invalid("token expired"));
        }

        if claims.has_route_scope() && !is_path_allowed(path, &claims.allowed_routes) {
            debug!(api_key = %claims.api_key, path = %path, "Path not allowed");
            return Err(AccessDenied::Forbidden);
        }

        let record = self.resolve_record(&claims.api_key).await?;

        debug!(api_key = %claims.api_key, limit = record.rate_limit, "Rate limit resolved");

        if !record.is_enabled() {
            return Err(AccessDenied::missing("token disabled"));
        }

        self.enforce_rate_limit(&claims.api_key, record.rate_limit)
            .await?;

        debug!(api_key = %claims.api_key, limit = record.rate_limit, "Access allowed");

        Ok(claims)
    }

    async fn resolve_record(&self, api_key: &str) -> Result<TokenRecord, AccessDenied> {
        match self.bounded(self.store.get_token(api_key)).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) if e.is_credential_denial() => {
                debug!(api_key = %api_key, error = %e, "Token not usable");
                Err(AccessDenied::missing(format!("unknown token: {}", e)))
            }
            Ok(Err(e)) => {
                warn!(api_key = %api_key, error = %e, "Token store failure");
                Err(InfrastructureFailure::TokenStore(e.to_string()).into())
            }
            Err(_) => {
                warn!(api_key = %api_key, timeout = ?self.store_timeout, "Token store timed out");
                Err(InfrastructureFailure::TokenStore("timed out".into()).into())
            }
        }
    }

    async fn enforce_rate_limit(&self, api_key: &str, limit: i64) -> Result<(), AccessDenied> {
        match self.bounded(self.limiter.allow(api_key, limit)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => {
                info!(api_key = %api_key, limit, "Rate limit exceeded");
                Err(AccessDenied::RateExceeded)
            }
            Ok(Err(e)) => {
                warn!(api_key = %api_key, error = %e, "Rate limiter failure");
                Err(InfrastructureFailure::RateLimiter(e.to_string()).into())
            }
            Err(_) => {
                warn!(api_key = %api_key, timeout = ?self.store_timeout, "Rate limiter timed out");
                Err(InfrastructureFailure::RateLimiter("timed out".into()).into())
            }
        }
    }

    async fn bounded<F: Future>(&self, fut: F) -> Result<F::Output, tokio::time::error::Elapsed> {
        tokio::time::timeout(self.store_timeout, fut).await
    }
}

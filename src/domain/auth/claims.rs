//! Bearer token claims and the verifier trait

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Structured claims carried by a signed bearer token
///
/// Derived per request and only ever read by the access pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identifier of the token record this bearer token refers to
    #[serde(default)]
    pub api_key: String,
    /// Route patterns the bearer may call; empty means unrestricted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_routes: Vec<String>,
    /// Rate limit hint issued alongside the token (the stored record wins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<i64>,
    /// Human readable expiry (RFC 3339), informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
    /// Issued at timestamp (Unix epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    /// Create claims for an API key expiring at the given instant
    pub fn new(api_key: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            api_key: api_key.into(),
            allowed_routes: Vec::new(),
            rate_limit: None,
            expires_at: Some(expires_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            exp: expires_at.timestamp(),
            iat: None,
        }
    }

    pub fn with_allowed_routes(mut self, routes: Vec<String>) -> Self {
        self.allowed_routes = routes;
        self
    }

    pub fn with_rate_limit(mut self, limit: i64) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.iat = Some(issued_at.timestamp());
        self
    }

    /// Expiry as a UTC instant, `None` when the timestamp is out of range
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// True unless the expiry lies strictly after `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration() {
            Some(exp) => exp <= now,
            None => true,
        }
    }

    pub fn has_route_scope(&self) -> bool {
        !self.allowed_routes.is_empty()
    }
}

/// Errors produced while verifying a bearer token
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("no verification key configured")]
    MissingKey,

    #[error("expected algorithm not configured")]
    MissingAlgorithm,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("missing api_key claim")]
    MissingApiKey,
}

impl VerifyError {
    /// Misconfiguration rather than a bad credential
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingKey | Self::MissingAlgorithm)
    }
}

/// Capability that validates a bearer string and extracts its claims
///
/// Implementations must be pure: the result depends only on the token and
/// the configured key material.
#[cfg_attr(test, automock)]
pub trait ClaimsVerifier: Send + Sync {
    fn parse(&self, token: &str) -> Result<Claims, VerifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_expiry_is_strict() {
        let claims = Claims::new("k1", at(12));

        assert!(!claims.is_expired_at(at(11)));
        assert!(claims.is_expired_at(at(12)));
        assert!(claims.is_expired_at(at(12) + Duration::seconds(1)));
    }

    #[test]
    fn test_new_sets_both_expiry_forms() {
        let claims = Claims::new("k1", at(12));

        assert_eq!(claims.exp, at(12).timestamp());
        assert_eq!(claims.expires_at.as_deref(), Some("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let claims: Claims = serde_json::from_str(r#"{"api_key":"k1","exp":1714564800}"#).unwrap();

        assert_eq!(claims.api_key, "k1");
        assert!(claims.allowed_routes.is_empty());
        assert!(claims.rate_limit.is_none());
        assert!(!claims.has_route_scope());
    }

    #[test]
    fn test_deserialize_requires_exp() {
        let result: Result<Claims, _> = serde_json::from_str(r#"{"api_key":"k1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_skips_empty_scope() {
        let claims = Claims::new("k1", at(12));
        let json = serde_json::to_string(&claims).unwrap();

        assert!(!json.contains("allowed_routes"));
        assert!(json.contains("\"exp\""));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(VerifyError::MissingKey.is_configuration());
        assert!(VerifyError::MissingAlgorithm.is_configuration());
        assert!(!VerifyError::MissingApiKey.is_configuration());
        assert!(!VerifyError::InvalidToken("bad".into()).is_configuration());
    }
}

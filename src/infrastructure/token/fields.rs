//! Hash-field layout of a stored token record
//!
//! ```text
//! api_key         string
//! rate_limit      decimal integer
//! expires_at      RFC 3339 timestamp
//! allowed_routes  JSON array of strings
//! ```

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{TokenRecord, TokenStoreError};

const FIELD_API_KEY: &str = "api_key";
const FIELD_RATE_LIMIT: &str = "rate_limit";
const FIELD_EXPIRES_AT: &str = "expires_at";
const FIELD_ALLOWED_ROUTES: &str = "allowed_routes";

pub fn encode_record(record: &TokenRecord) -> Result<Vec<(&'static str, String)>, TokenStoreError> {
    let routes = serde_json::to_string(&record.allowed_routes)
        .map_err(|e| TokenStoreError::invalid(format!("failed to encode allowed_routes: {}", e)))?;

    Ok(vec![
        (FIELD_API_KEY, record.api_key.clone()),
        (FIELD_RATE_LIMIT, record.rate_limit.to_string()),
        (
            FIELD_EXPIRES_AT,
            record.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        (FIELD_ALLOWED_ROUTES, routes),
    ])
}

/// Rebuild a record from its hash fields
///
/// A missing `api_key` field falls back to the key the record was looked up
/// under. A non-positive `rate_limit` decodes fine; the record is simply
/// disabled.
pub fn decode_record(
    api_key: &str,
    fields: &HashMap<String, String>,
) -> Result<TokenRecord, TokenStoreError> {
    let stored_key = fields
        .get(FIELD_API_KEY)
        .filter(|key| !key.is_empty())
        .map(String::as_str)
        .unwrap_or(api_key);

    let rate_limit = fields
        .get(FIELD_RATE_LIMIT)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| TokenStoreError::invalid("missing rate_limit"))?
        .trim()
        .parse::<i64>()
        .map_err(|e| TokenStoreError::invalid(format!("bad rate_limit: {}", e)))?;

    let expires_at = fields
        .get(FIELD_EXPIRES_AT)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| TokenStoreError::invalid("missing expires_at"))?;
    let expires_at = DateTime::parse_from_rfc3339(expires_at.trim())
        .map_err(|e| TokenStoreError::invalid(format!("bad expires_at: {}", e)))?
        .with_timezone(&Utc);

    let allowed_routes = match fields.get(FIELD_ALLOWED_ROUTES) {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<Vec<String>>(raw)
            .map_err(|e| TokenStoreError::invalid(format!("bad allowed_routes: {}", e)))?,
        _ => Vec::new(),
    };

    Ok(TokenRecord::new(stored_key, rate_limit, expires_at).with_allowed_routes(allowed_routes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_layout() {
        let record = TokenRecord::new("abc", 10, Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap())
            .with_allowed_routes(vec!["/api/*".to_string()]);

        let encoded: HashMap<_, _> = encode_record(&record).unwrap().into_iter().collect();

        assert_eq!(encoded["api_key"], "abc");
        assert_eq!(encoded["rate_limit"], "10");
        assert_eq!(encoded["expires_at"], "2030-01-02T03:04:05Z");
        assert_eq!(encoded["allowed_routes"], r#"["/api/*"]"#);
    }

    #[test]
    fn test_empty_routes_encode_as_empty_array() {
        let record = TokenRecord::new("abc", 1, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());

        let encoded: HashMap<_, _> = encode_record(&record).unwrap().into_iter().collect();

        assert_eq!(encoded["allowed_routes"], "[]");
    }

    #[test]
    fn test_decode_full_record() {
        let record = decode_record(
            "abc",
            &fields(&[
                ("api_key", "abc"),
                ("rate_limit", "25"),
                ("expires_at", "2030-01-01T00:00:00+02:00"),
                ("allowed_routes", r#"["/a","/b/*"]"#),
            ]),
        )
        .unwrap();

        assert_eq!(record.rate_limit, 25);
        assert_eq!(
            record.expires_at,
            Utc.with_ymd_and_hms(2029, 12, 31, 22, 0, 0).unwrap()
        );
        assert_eq!(record.allowed_routes, vec!["/a", "/b/*"]);
    }

    #[test]
    fn test_decode_falls_back_to_lookup_key() {
        let record = decode_record(
            "lookup",
            &fields(&[("rate_limit", "1"), ("expires_at", "2030-01-01T00:00:00Z")]),
        )
        .unwrap();

        assert_eq!(record.api_key, "lookup");
        assert!(record.allowed_routes.is_empty());
    }

    #[test]
    fn test_decode_disabled_record() {
        let record = decode_record(
            "abc",
            &fields(&[("rate_limit", "0"), ("expires_at", "2030-01-01T00:00:00Z")]),
        )
        .unwrap();

        assert!(!record.is_enabled());
    }

    #[test]
    fn test_decode_missing_rate_limit() {
        let result = decode_record("abc", &fields(&[("expires_at", "2030-01-01T00:00:00Z")]));
        assert!(matches!(result, Err(TokenStoreError::Invalid(_))));
    }

    #[test]
    fn test_decode_bad_rate_limit() {
        let result = decode_record(
            "abc",
            &fields(&[("rate_limit", "lots"), ("expires_at", "2030-01-01T00:00:00Z")]),
        );
        assert!(matches!(result, Err(TokenStoreError::Invalid(_))));
    }

    #[test]
    fn test_decode_bad_expiry() {
        let result = decode_record(
            "abc",
            &fields(&[("rate_limit", "5"), ("expires_at", "tomorrow")]),
        );
        assert!(matches!(result, Err(TokenStoreError::Invalid(_))));
    }

    #[test]
    fn test_decode_bad_routes() {
        let result = decode_record(
            "abc",
            &fields(&[
                ("rate_limit", "5"),
                ("expires_at", "2030-01-01T00:00:00Z"),
                ("allowed_routes", "/a,/b"),
            ]),
        );
        assert!(matches!(result, Err(TokenStoreError::Invalid(_))));
    }
}

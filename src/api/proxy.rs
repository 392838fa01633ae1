//! Forwarding of accepted requests to the upstream service

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri},
    response::Response,
};
use reqwest::Url;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use super::types::ApiError;
use crate::config::UpstreamConfig;
use crate::domain::{Claims, DomainError};

/// Header carrying the verified API key to the upstream
pub const API_KEY_HEADER: &str = "x-gateway-api-key";

const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Sink receiving requests the access pipeline accepted
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: Request<Body>, claims: Claims) -> Result<Response, ApiError>;
}

/// Streams requests to a single upstream base URL
#[derive(Clone)]
pub struct UpstreamProxy {
    client: reqwest::Client,
    target: Url,
}

impl fmt::Debug for UpstreamProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamProxy")
            .field("target", &self.target.as_str())
            .finish_non_exhaustive()
    }
}

impl UpstreamProxy {
    pub fn new(config: &UpstreamConfig) -> Result<Self, DomainError> {
        let target = Url::parse(&config.target_url).map_err(|e| {
            DomainError::configuration(format!("Invalid upstream URL '{}': {}", config.target_url, e))
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, target })
    }

    /// Append the request path and query to the target's base path
    fn upstream_url(&self, uri: &Uri) -> Url {
        let mut url = self.target.clone();
        let base = self.target.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", base, uri.path()));
        url.set_query(uri.query());
        url
    }
}

#[async_trait]
impl Forwarder for UpstreamProxy {
    async fn forward(&self, request: Request<Body>, claims: Claims) -> Result<Response, ApiError> {
        let (parts, body) = request.into_parts();
        let url = self.upstream_url(&parts.uri);

        let mut headers = strip_hop_by_hop(parts.headers);
        headers.remove(header::HOST);
        if let Ok(value) = HeaderValue::from_str(&claims.api_key) {
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        debug!(method = %parts.method, upstream = %url, "Forwarding request");

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await
            .map_err(map_upstream_error)?;

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers().clone());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        Ok(response)
    }
}

/// Drop connection-scoped headers, including any the `Connection` header names
fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP_HEADERS.iter().copied().chain(listed.iter().map(String::as_str)) {
        headers.remove(name);
    }

    headers
}

fn map_upstream_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        warn!(error = %err, "Upstream timed out");
        return ApiError::gateway_timeout("gateway timeout");
    }

    if exceeded_body_limit(&err) {
        return ApiError::payload_too_large("request body too large");
    }

    warn!(error = %err, "Upstream request failed");
    ApiError::bad_gateway("bad gateway")
}

fn exceeded_body_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(current) = source {
        if current.to_string().contains("length limit exceeded") {
            return true;
        }
        source = current.source();
    }
    false
}

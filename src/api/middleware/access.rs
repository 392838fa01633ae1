//! Access-control middleware

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::AccessDenied;
use crate::infrastructure::observability::record_access_decision;

/// Run the access pipeline and either continue with the verified
/// [`Claims`](crate::domain::Claims) in the request extensions or answer with
/// the mapped rejection
pub async fn access_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // A header that is not valid UTF-8 is treated as absent
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let path = request.uri().path().to_owned();

    match state.pipeline.evaluate(authorization.as_deref(), &path).await {
        Ok(claims) => {
            record_access_decision("allowed");
            debug!(api_key = %claims.api_key, path = %path, "Access granted");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(denied) => {
            record_access_decision(denied.outcome());
            log_denial(&denied, &path);
            ApiError::from(denied).into_response()
        }
    }
}

fn log_denial(denied: &AccessDenied, path: &str) {
    match denied {
        AccessDenied::Infrastructure(failure) => {
            error!(path = %path, error = %failure, "Access check failed");
        }
        other => {
            warn!(path = %path, outcome = other.outcome(), reason = %other, "Access denied");
        }
    }
}

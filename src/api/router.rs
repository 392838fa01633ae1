use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Extension, Router,
};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::health;
use super::middleware::{access_middleware, logging_middleware, metrics_middleware};
use super::state::AppState;
use crate::config::ServerConfig;
use crate::domain::Claims;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the gateway router
///
/// Probes are open; every route under `/api/v1/` goes through the access
/// middleware before reaching the forwarder.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let protected = Router::new()
        .route("/api/v1/{*path}", any(forward))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .merge(protected)
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

async fn forward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    request: Request<Body>,
) -> Response {
    match state.forwarder.forward(request, claims).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

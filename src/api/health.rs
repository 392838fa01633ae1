//! Health check endpoints for Kubernetes probes

use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::state::AppState;

const READINESS_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

fn healthy() -> HealthResponse {
    HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    }
}

/// Process is up
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(healthy()))
}

/// Liveness probe
pub async fn live_check() -> impl IntoResponse {
    (StatusCode::OK, Json(healthy()))
}

/// Readiness probe: the token store must answer a ping
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let store_check = check_token_store(&state).await;
    let status = store_check.status;

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![store_check]),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (code, Json(response))
}

async fn check_token_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let result = tokio::time::timeout(READINESS_TIMEOUT, state.token_store.ping()).await;
    let latency_ms = Some(start.elapsed().as_millis() as u64);

    let (status, message) = match result {
        Ok(Ok(())) => (HealthStatus::Healthy, None),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Token store not ready");
            (HealthStatus::Unhealthy, Some(e.to_string()))
        }
        Err(_) => {
            tracing::warn!("Token store ping timed out");
            (HealthStatus::Unhealthy, Some("ping timed out".to_string()))
        }
    };

    HealthCheck {
        name: "token_store".to_string(),
        status,
        message,
        latency_ms,
    }
}

//! Health check endpoints for Kubernetes probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;
#[cfg(feature = "prometheus")]
use crate::observability::metrics::get_prometheus_handle;

/// Detailed health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Service version
    pub version: String,
    pub dataset: DatasetStatus,
}

/// State of the table store.
#[derive(Debug, Serialize)]
pub struct DatasetStatus {
    pub loaded: bool,
    /// Row count, when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    /// Column headers in file order, when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Load failure, when not loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Full health check including the dataset.
///
/// Returns 503 when the dataset failed to load, since every report query
/// would fail.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let dataset = match state.store.table() {
        Ok(table) => DatasetStatus {
            loaded: true,
            rows: Some(table.len()),
            columns: Some(table.columns().to_vec()),
            message: None,
        },
        Err(error) => DatasetStatus {
            loaded: false,
            rows: None,
            columns: None,
            message: Some(error.to_string()),
        },
    };

    let (status_code, status) = if dataset.loaded {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let health = HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dataset,
    };

    (status_code, Json(health))
}

/// Kubernetes liveness probe.
///
/// Returns 200 while the process is serving, whatever the dataset state.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Kubernetes readiness probe.
///
/// Returns 200 once the dataset is loaded, 503 otherwise. A failed load is
/// not retried, so the pod stays unready until restarted.
#[tracing::instrument(name = "health.readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.store.is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus metrics endpoint.
///
/// Returns metrics in Prometheus text format.
#[tracing::instrument(name = "health.metrics")]
pub async fn metrics() -> impl IntoResponse {
    #[cfg(feature = "prometheus")]
    {
        return match get_prometheus_handle() {
            Some(handle) => (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            ),
            None => (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            ),
        };
    }
    #[cfg(not(feature = "prometheus"))]
    (
        StatusCode::NOT_FOUND,
        [("content-type", "text/plain")],
        "Prometheus metrics not enabled".to_string(),
    )
}

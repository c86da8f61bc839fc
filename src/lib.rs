//! HTTP query service for grouped usage and cost reports.
//!
//! The dataset is a CSV file loaded once into a [`table::TableStore`]. Each
//! `GET /usage-cost-report` request is validated, then run through the
//! [`report`] pipeline against the shared, read-only table.

use std::{sync::Arc, time::Duration};

use axum::{Router, http::StatusCode, routing::get};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub mod config;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod report;
pub mod routes;
pub mod table;

#[cfg(test)]
mod tests;

/// State shared by every handler. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::ReportConfig>,
    pub store: Arc<table::TableStore>,
}

impl AppState {
    pub fn new(config: config::ReportConfig, store: table::TableStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}

/// Requests still running after `timeout_secs` get a 408.
fn timeout_layer(server: &config::ServerConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(server.timeout_secs),
    )
}

pub fn build_app(config: &config::ReportConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route(
            "/usage-cost-report",
            get(routes::report::usage_cost_report),
        )
        // Health check endpoints
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness));

    if config.observability.metrics.enabled {
        app = app.route(
            &config.observability.metrics.path,
            get(routes::health::metrics),
        );
    }

    app = app.layer(timeout_layer(&config.server));

    if let Some(cors_layer) = config.server.cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    // Outermost, so every response carries a request ID
    app.layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}

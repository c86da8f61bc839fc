//! Prometheus metrics for the report service.
//!
//! Provides metrics for:
//! - Report requests by outcome and the number of groups returned
//! - Errors by type and code
//! - Size of the loaded dataset

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Global Prometheus handle for the metrics endpoint.
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system with the given configuration.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("report_groups".to_string()),
            &config.group_buckets,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    let handle = builder.install_recorder().map_err(MetricsError::Install)?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::Setup("Metrics already initialized".to_string()))?;

    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if config.enabled {
        tracing::warn!(
            "observability.metrics.enabled is set but the 'prometheus' feature is not compiled"
        );
    }
    Ok(())
}

/// Get the Prometheus handle for rendering metrics.
#[cfg(feature = "prometheus")]
pub fn get_prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record a successfully served report and how many groups it carried.
pub fn record_report_served(groups: usize) {
    #[cfg(feature = "prometheus")]
    {
        counter!("report_requests_total", "outcome" => "ok").increment(1);
        histogram!("report_groups").record(groups as f64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = groups;
    }
}

/// Record a report request that ended in an error response.
///
/// `error_type` is the coarse class (validation_error, row_limit, unavailable,
/// internal_error); `error_code` is the machine code sent to the client.
pub fn record_report_error(error_type: &str, error_code: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("report_requests_total", "outcome" => "error").increment(1);
        counter!(
            "report_errors_total",
            "error_type" => error_type.to_string(),
            "error_code" => error_code.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (error_type, error_code);
    }
}

/// Record the number of rows held by the table store (0 when unavailable).
pub fn set_dataset_rows(rows: usize) {
    #[cfg(feature = "prometheus")]
    gauge!("dataset_rows").set(rows as f64);
    #[cfg(not(feature = "prometheus"))]
    let _ = rows;
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}

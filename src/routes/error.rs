use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{observability::metrics, report::ReportError};

/// Error body returned by the report endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }
}

/// Failures of a report request, mapped to status codes at the boundary.
#[derive(Debug)]
pub enum ApiError {
    /// Bad or missing parameter. The message is sent as-is.
    Validation(String),
    RowLimitExceeded {
        limit: usize,
    },
    /// The dataset failed to load at startup.
    DatasetUnavailable(String),
    Internal(String),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::DatasetUnavailable { reason } => ApiError::DatasetUnavailable(reason),
            ReportError::RowLimitExceeded { limit, found } => {
                tracing::info!(limit, found, "Report rejected, too many groups");
                ApiError::RowLimitExceeded { limit }
            }
            ReportError::Serialization(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body, error_type, code) = match self {
            ApiError::Validation(msg) => {
                tracing::debug!(error = %msg, "Rejected report parameters");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new(msg),
                    "validation_error",
                    "invalid_parameter",
                )
            }
            ApiError::RowLimitExceeded { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    error: "RowLimitExceeded".to_string(),
                    message: Some(format!(
                        "The number of rows matching your request exceeds the allowed maximum of {limit}. Please adjust your filters."
                    )),
                },
                "row_limit",
                "RowLimitExceeded",
            ),
            ApiError::DatasetUnavailable(reason) => {
                tracing::warn!(reason = %reason, "Report requested while dataset is unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("CSV file could not be loaded."),
                    "unavailable",
                    "dataset_unavailable",
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("An internal error occurred"),
                    "internal_error",
                    "internal_error",
                )
            }
        };

        metrics::record_report_error(error_type, code);

        (status, Json(body)).into_response()
    }
}

//! Error mapping from pipeline failures to HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use demand_forecast::ForecastError;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the HTTP layer.
///
/// Every kind serializes to the same `{"detail": "..."}` body; only the
/// status code differs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No dataset has been loaded and fitted yet
    #[error("model not ready: no dataset has been loaded successfully")]
    NotReady,

    /// The request or uploaded dataset failed validation
    #[error("{0}")]
    Validation(String),

    /// Model estimation failed on otherwise valid data
    #[error("{0}")]
    Fitting(String),

    /// Unexpected internal failure
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Fitting(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, detail = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::DataError(_)
            | ForecastError::ValidationError(_)
            | ForecastError::InvalidParameter(_)
            | ForecastError::InsufficientData { .. } => ApiError::Validation(err.to_string()),
            ForecastError::FittingError(_) => ApiError::Fitting(err.to_string()),
            ForecastError::IoError(_) => ApiError::Internal(err.to_string()),
        }
    }
}

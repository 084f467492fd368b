//! HTTP mapping of forecasting errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use consumption_forecast::ForecastError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// Request rejected before reaching the library
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A blocking task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            ApiError::Forecast(ForecastError::ValidationError(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            ApiError::Forecast(ForecastError::NotReady(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "model_not_ready")
            }
            ApiError::Forecast(ForecastError::StorageError(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            ApiError::Forecast(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(serde_json::json!({
            "error": kind,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

//! Error types for the consumption_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the consumption_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A prediction was requested before any model finished loading
    #[error("Model not ready: {0}")]
    NotReady(String),

    /// Failure contacting the model registry or reading what it returned
    #[error("Registry error: {0}")]
    RegistryError(String),

    /// Malformed input: wrong shape, missing column, bad record
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A log or reference file needed by a monitoring cycle is missing
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Writing a log line or a metrics row failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// The experiment-tracking sink rejected or failed a request
    #[error("Tracking error: {0}")]
    TrackingError(String),

    /// A monitoring report template failed to register or render
    #[error("Report error: {0}")]
    ReportError(String),

    /// The underlying model misbehaved during a forecast
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON encoding or decoding
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from the metrics database
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// Error from metric or drift calculations
    #[error("Math error: {0}")]
    MathError(#[from] consumption_math::MathError),
}

impl ForecastError {
    /// Whether the condition is expected to clear up on its own
    ///
    /// Registry hiccups and a not-yet-loaded model are retried by the
    /// watcher; everything else needs an operator or a different input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ForecastError::NotReady(_) | ForecastError::RegistryError(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::TrackingError(err.to_string())
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

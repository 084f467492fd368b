//! # Consumption Math
//!
//! Numeric building blocks for monitoring consumption forecasts.
//! This crate provides the regression metrics used to score served
//! forecasts against ground truth, descriptive statistics for reports and
//! the two-sample tests used to detect distribution drift.

use thiserror::Error;

// Calculation modules
pub mod drift;
pub mod regression;
pub mod summary;

pub use drift::{detect_drift, DriftMethod, DriftResult};
pub use regression::RegressionMetrics;
pub use summary::Summary;

/// Errors that can occur in metric and statistic calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for consumption math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Check that two paired series can be compared element-wise
pub(crate) fn check_paired(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "At least one observation is required".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Check that every value of a series is finite
pub(crate) fn check_finite(values: &[f64], what: &str) -> Result<()> {
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(format!(
            "{} contains a non-finite value at position {}",
            what, pos
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_check_rejects_mismatch() {
        assert!(check_paired(&[1.0], &[1.0, 2.0]).is_err());
        assert!(matches!(
            check_paired(&[], &[]),
            Err(MathError::InsufficientData(_))
        ));
        assert!(check_paired(&[1.0, 2.0], &[3.0, 4.0]).is_ok());
    }

    #[test]
    fn finite_check_reports_position() {
        let err = check_finite(&[1.0, f64::NAN], "target").unwrap_err();
        assert!(err.to_string().contains("position 1"));
    }
}

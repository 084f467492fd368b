//! Regression metrics for forecast evaluation
//!
//! Contains the accuracy measures reported by the monitoring pipeline:
//! - Mean Absolute Error (MAE)
//! - Mean Squared Error (MSE) and its root (RMSE)
//! - Coefficient of determination (R²)
//! - Mean Absolute Percentage Error (MAPE)

use crate::{check_finite, check_paired, MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Absolute Error between actual and predicted values
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_paired(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Mean Squared Error between actual and predicted values
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_paired(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Root Mean Squared Error between actual and predicted values
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, predicted)?.sqrt())
}

/// Coefficient of determination
///
/// Fails when the actual values have zero variance, where R² is undefined.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_paired(actual, predicted)?;

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot <= f64::EPSILON {
        return Err(MathError::CalculationError(
            "R² is undefined for a constant target".to_string(),
        ));
    }

    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Ok(1.0 - ss_res / ss_tot)
}

/// Mean Absolute Percentage Error, as a fraction
///
/// Observations whose actual value is zero are ignored.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_paired(actual, predicted)?;

    let (sum, count) = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, _)| a.abs() > f64::EPSILON)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });

    if count == 0 {
        return Err(MathError::InsufficientData(
            "MAPE needs at least one non-zero actual value".to_string(),
        ));
    }

    Ok(sum / count as f64)
}

/// Accuracy of a set of paired forecasts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Number of paired observations
    pub count: usize,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination, `None` for a constant target
    pub r2: Option<f64>,
    /// Mean Absolute Percentage Error, `None` when every actual is zero
    pub mape: Option<f64>,
}

impl RegressionMetrics {
    /// Evaluate predictions against actual values
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        check_paired(actual, predicted)?;
        check_finite(actual, "actual values")?;
        check_finite(predicted, "predicted values")?;

        let mse = mean_squared_error(actual, predicted)?;

        Ok(Self {
            count: actual.len(),
            mae: mean_absolute_error(actual, predicted)?,
            mse,
            rmse: mse.sqrt(),
            r2: r2_score(actual, predicted).ok(),
            mape: mean_absolute_percentage_error(actual, predicted).ok(),
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Performance Metrics ({} points):", self.count)?;
        writeln!(f, "  MAE:     {:.4}", self.mae)?;
        writeln!(f, "  MSE:     {:.4}", self.mse)?;
        writeln!(f, "  RMSE:    {:.4}", self.rmse)?;
        match self.r2 {
            Some(r2) => writeln!(f, "  R2:      {:.4}", r2)?,
            None => writeln!(f, "  R2:      n/a")?,
        }
        match self.mape {
            Some(mape) => writeln!(f, "  MAPE:    {:.4}%", mape * 100.0)?,
            None => writeln!(f, "  MAPE:    n/a")?,
        }
        Ok(())
    }
}

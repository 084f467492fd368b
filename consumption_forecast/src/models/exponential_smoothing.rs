//! Exponential smoothing regressor

use crate::error::{ForecastError, Result};
use crate::models::{FeatureMatrix, ModelHandle};

/// Simple exponential smoothing over each window
///
/// The level starts at the oldest value and is updated through the window;
/// the final level is the one-step-ahead prediction.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothingModel {
    /// Name of the model
    name: String,
    /// Smoothing parameter
    alpha: f64,
}

impl ExponentialSmoothingModel {
    /// Create a new exponential smoothing model
    pub fn new(name: &str, alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha > 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Alpha must be in (0, 1]".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            alpha,
        })
    }

    /// Smoothing parameter
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn level(&self, window: &[f64]) -> f64 {
        let mut level = window[0];
        for &value in &window[1..] {
            level = self.alpha * value + (1.0 - self.alpha) * level;
        }
        level
    }
}

impl ModelHandle for ExponentialSmoothingModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(features.iter_rows().map(|row| self.level(row)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

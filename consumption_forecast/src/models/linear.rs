//! Linear autoregressive regressor

use crate::error::{ForecastError, Result};
use crate::models::{FeatureMatrix, ModelHandle};

/// `y = intercept + Σ weights[i] * window[i]`
///
/// The weight vector fixes the window width the model accepts.
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// Create a linear model from its coefficients
    pub fn new(name: &str, weights: Vec<f64>, intercept: f64) -> Result<Self> {
        if weights.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Linear model needs at least one weight".to_string(),
            ));
        }
        if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "Linear model coefficients must be finite".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            weights,
            intercept,
        })
    }

    /// Model coefficients, oldest lag first
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl ModelHandle for LinearModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if features.cols() != self.weights.len() {
            return Err(ForecastError::ValidationError(format!(
                "Linear model expects {} features per row, got {}",
                self.weights.len(),
                features.cols()
            )));
        }

        Ok(features
            .iter_rows()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .zip(&self.weights)
                        .map(|(x, w)| x * w)
                        .sum::<f64>()
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn window_size(&self) -> Option<usize> {
        Some(self.weights.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_weights_and_intercept() {
        let model = LinearModel::new("lin", vec![0.0, 0.5, 0.5], 1.0).unwrap();
        let x = FeatureMatrix::from_rows(&[vec![9.0, 2.0, 4.0]]).unwrap();
        assert_eq!(model.predict(&x).unwrap(), vec![4.0]);
        assert_eq!(model.window_size(), Some(3));
    }

    #[test]
    fn rejects_wrong_width() {
        let model = LinearModel::new("lin", vec![1.0, 1.0], 0.0).unwrap();
        let x = FeatureMatrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(
            model.predict(&x),
            Err(ForecastError::ValidationError(_))
        ));
    }
}

//! Moving average regressor

use crate::error::{ForecastError, Result};
use crate::models::{FeatureMatrix, ModelHandle};

/// Predicts the mean of the most recent `window` values of each row
#[derive(Debug, Clone)]
pub struct MovingAverageModel {
    /// Name of the model
    name: String,
    /// Number of trailing values averaged
    window: usize,
}

impl MovingAverageModel {
    /// Create a new moving average model
    pub fn new(name: &str, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            window,
        })
    }

    /// Number of trailing values averaged
    pub fn window(&self) -> usize {
        self.window
    }
}

impl ModelHandle for MovingAverageModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        if features.cols() < self.window {
            return Err(ForecastError::ValidationError(format!(
                "Insufficient data for moving average. Need at least {} values per row, got {}.",
                self.window,
                features.cols()
            )));
        }

        // Average the tail of every window
        Ok(features
            .iter_rows()
            .map(|row| row[row.len() - self.window..].iter().sum::<f64>() / self.window as f64)
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_the_tail() {
        let model = MovingAverageModel::new("ma", 2).unwrap();
        let x = FeatureMatrix::from_rows(&[vec![1.0, 2.0, 4.0], vec![0.0, 10.0, 20.0]]).unwrap();
        assert_eq!(model.predict(&x).unwrap(), vec![3.0, 15.0]);
    }

    #[test]
    fn window_wider_than_rows_fails() {
        let model = MovingAverageModel::new("ma", 5).unwrap();
        let x = FeatureMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        assert!(model.predict(&x).is_err());
    }
}

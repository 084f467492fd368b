//! Single-step regressors and the feature matrix they consume

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Row-major matrix of consumption windows
///
/// Every row is one Feature Window; all rows share the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from request rows
    ///
    /// Rejects empty input, ragged rows and non-finite values.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or_else(|| {
            ForecastError::ValidationError("At least one feature row is required".to_string())
        })?;
        let cols = first.len();
        if cols == 0 {
            return Err(ForecastError::ValidationError(
                "Feature rows must not be empty".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ForecastError::ValidationError(format!(
                    "Row {} has {} values, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForecastError::ValidationError(format!(
                    "Row {} has a non-finite value at position {}",
                    i, j
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of windows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Window width
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Borrow one window
    pub fn row(&self, index: usize) -> &[f64] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Iterate over the windows in order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.cols)
    }

    /// Drop the oldest column and append `column` as the newest one
    ///
    /// The width stays constant; `column` must hold one value per row.
    pub fn shift_append(&mut self, column: &[f64]) -> Result<()> {
        if column.len() != self.rows {
            return Err(ForecastError::ValidationError(format!(
                "Column has {} values, matrix has {} rows",
                column.len(),
                self.rows
            )));
        }

        for (window, &value) in self.data.chunks_exact_mut(self.cols).zip(column) {
            window.rotate_left(1);
            window[self.cols - 1] = value;
        }
        Ok(())
    }

    /// Copy the matrix back into nested rows
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(|r| r.to_vec()).collect()
    }
}

/// A trained single-step regressor
///
/// Given a batch of windows it returns one value per window: the
/// consumption expected right after that window.
pub trait ModelHandle: Debug + Send + Sync {
    /// Predict the next value for every row
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Name of the model
    fn name(&self) -> &str;

    /// Window width the model was trained on, if it cares
    fn window_size(&self) -> Option<usize> {
        None
    }
}

/// Serialized form of the built-in regressors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// Linear autoregression over the whole window
    Linear { weights: Vec<f64>, intercept: f64 },
    /// Mean of the most recent `window` values
    MovingAverage { window: usize },
    /// Exponentially weighted level of the window
    ExponentialSmoothing { alpha: f64 },
}

impl ModelArtifact {
    /// Turn the artifact into a servable model
    pub fn into_model(self, name: &str) -> Result<Box<dyn ModelHandle>> {
        Ok(match self {
            ModelArtifact::Linear { weights, intercept } => {
                Box::new(linear::LinearModel::new(name, weights, intercept)?)
            }
            ModelArtifact::MovingAverage { window } => {
                Box::new(moving_average::MovingAverageModel::new(name, window)?)
            }
            ModelArtifact::ExponentialSmoothing { alpha } => Box::new(
                exponential_smoothing::ExponentialSmoothingModel::new(name, alpha)?,
            ),
        })
    }
}

pub mod exponential_smoothing;
pub mod linear;
pub mod moving_average;

pub use exponential_smoothing::ExponentialSmoothingModel;
pub use linear::LinearModel;
pub use moving_average::MovingAverageModel;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_append_slides_every_row() {
        let mut m = FeatureMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        m.shift_append(&[7.0, 8.0]).unwrap();
        assert_eq!(m.to_rows(), vec![vec![2.0, 3.0, 7.0], vec![5.0, 6.0, 8.0]]);
        assert!(m.shift_append(&[1.0]).is_err());
    }

    #[test]
    fn test_from_rows_rejects_bad_input() {
        assert!(FeatureMatrix::from_rows(&[]).is_err());
        assert!(FeatureMatrix::from_rows(&[vec![]]).is_err());
        assert!(FeatureMatrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(FeatureMatrix::from_rows(&[vec![f64::INFINITY]]).is_err());
    }

    #[test]
    fn test_artifact_json_format() {
        let artifact: ModelArtifact =
            serde_json::from_str(r#"{"kind": "moving_average", "window": 4}"#).unwrap();
        assert_eq!(artifact, ModelArtifact::MovingAverage { window: 4 });
        let model = artifact.into_model("consumption").unwrap();
        assert_eq!(model.name(), "consumption");
    }
}

//! Multi-step forecasting from a single-step regressor
//!
//! Each round predicts one value per window, records it, then slides the
//! window: the oldest value drops out and the prediction becomes the newest
//! value of the next round's input.

use crate::error::{ForecastError, Result};
use crate::models::{FeatureMatrix, ModelHandle};
use tracing::debug;

/// Turns a point-forecast model into a multi-step forecaster
#[derive(Debug)]
pub struct AutoregressivePredictor<'a> {
    model: &'a dyn ModelHandle,
}

impl<'a> AutoregressivePredictor<'a> {
    /// Wrap a trained model
    pub fn new(model: &'a dyn ModelHandle) -> Self {
        Self { model }
    }

    /// Forecast `n_predictions` steps for every row of `features`
    ///
    /// Returns one row per input window and one column per step. With zero
    /// steps every row is empty and the model is never called.
    pub fn predict(&self, features: &FeatureMatrix, n_predictions: usize) -> Result<Vec<Vec<f64>>> {
        let batch = features.rows();
        let mut outputs: Vec<Vec<f64>> = vec![Vec::with_capacity(n_predictions); batch];
        if n_predictions == 0 {
            return Ok(outputs);
        }

        let mut window = features.clone();
        for step in 0..n_predictions {
            let predicted = self.model.predict(&window)?;
            if predicted.len() != batch {
                return Err(ForecastError::ForecastingError(format!(
                    "Model '{}' returned {} values for {} rows at step {}",
                    self.model.name(),
                    predicted.len(),
                    batch,
                    step
                )));
            }
            if predicted.iter().any(|v| !v.is_finite()) {
                return Err(ForecastError::ForecastingError(format!(
                    "Model '{}' returned a non-finite value at step {}",
                    self.model.name(),
                    step
                )));
            }

            for (row, &value) in outputs.iter_mut().zip(&predicted) {
                row.push(value);
            }

            // The last step's window is never used
            if step + 1 < n_predictions {
                window.shift_append(&predicted)?;
            }
        }

        debug!(
            model = self.model.name(),
            rows = batch,
            steps = n_predictions,
            "autoregressive forecast complete"
        );
        Ok(outputs)
    }
}

/// Convenience wrapper building the matrix from nested rows
pub fn forecast_rows(
    model: &dyn ModelHandle,
    rows: &[Vec<f64>],
    n_predictions: usize,
) -> Result<Vec<Vec<f64>>> {
    let features = FeatureMatrix::from_rows(rows)?;
    AutoregressivePredictor::new(model).predict(&features, n_predictions)
}

//! Flattening of logged forecasts and the prediction/feedback join

use crate::logs::{FeedbackRecord, PredictionRecord};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A logged record with nested inputs and outputs
pub trait LoggedForecast {
    fn prediction_id(&self) -> &str;
    fn inputs(&self) -> &[Vec<f64>];
    fn outputs(&self) -> &[Vec<f64>];
}

impl LoggedForecast for PredictionRecord {
    fn prediction_id(&self) -> &str {
        &self.prediction_id
    }

    fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    fn outputs(&self) -> &[Vec<f64>] {
        &self.outputs
    }
}

impl LoggedForecast for FeedbackRecord {
    fn prediction_id(&self) -> &str {
        &self.prediction_id
    }

    fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    fn outputs(&self) -> &[Vec<f64>] {
        &self.outputs
    }
}

/// One (input row, forecast step) pair of a logged record
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    /// See [`row_id`]
    pub row_id: String,
    /// Window that led to this step
    pub features: Vec<f64>,
    /// Forecast (prediction log) or observed value (feedback log)
    pub value: f64,
}

/// A prediction paired with the ground truth reported for it
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub row_id: String,
    pub prediction: f64,
    pub target: f64,
}

/// Identifier of step `step` of input row `row`
///
/// `{prediction_id}_{row}` for the first step and `{prediction_id}_{row}_{step}`
/// after it, so an id never depends on how many steps other rows carry.
pub fn row_id(prediction_id: &str, row: usize, step: usize) -> String {
    if step == 0 {
        format!("{}_{}", prediction_id, row)
    } else {
        format!("{}_{}_{}", prediction_id, row, step)
    }
}

/// Expand records into one row per (input row, step) pair
///
/// Records whose input and output row counts differ are skipped with a
/// warning.
pub fn flatten<R: LoggedForecast>(records: &[R]) -> Vec<FlatRow> {
    let mut rows = Vec::new();

    for record in records {
        let (inputs, outputs) = (record.inputs(), record.outputs());
        if inputs.len() != outputs.len() {
            warn!(
                prediction_id = record.prediction_id(),
                inputs = inputs.len(),
                outputs = outputs.len(),
                "skipping record with mismatched input and output rows"
            );
            continue;
        }

        for (row, (input, output)) in inputs.iter().zip(outputs).enumerate() {
            for (step, &value) in output.iter().enumerate() {
                rows.push(FlatRow {
                    row_id: row_id(record.prediction_id(), row, step),
                    features: step_window(input, &output[..step]),
                    value,
                });
            }
        }
    }

    rows
}

/// The input window slid forward by the values that preceded a step
fn step_window(input: &[f64], previous: &[f64]) -> Vec<f64> {
    let width = input.len();
    let joined: Vec<f64> = input.iter().chain(previous).copied().collect();
    joined[joined.len() - width..].to_vec()
}

/// Pair every prediction with its feedback, dropping unmatched rows
///
/// When an id appears several times on either side, its first occurrence
/// is used.
pub fn join_feedback(predictions: &[FlatRow], feedback: &[FlatRow]) -> Vec<JoinedRow> {
    let mut truth: HashMap<&str, f64> = HashMap::with_capacity(feedback.len());
    for row in feedback {
        truth.entry(row.row_id.as_str()).or_insert(row.value);
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(predictions.len());
    predictions
        .iter()
        .filter(|row| seen.insert(row.row_id.as_str()))
        .filter_map(|row| {
            truth.get(row.row_id.as_str()).map(|&target| JoinedRow {
                row_id: row.row_id.clone(),
                prediction: row.value,
                target,
            })
        })
        .collect()
}

//! Append-only JSON Lines logs of served predictions and ground truth
//!
//! Records are validated when they are built, then appended as one complete
//! line per write. Existing lines are never read back or deduplicated here;
//! the monitoring pipeline copes with repeated ids.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the prediction log inside the log directory
pub const PREDICTION_LOG_FILE: &str = "predictions.jsonl";

/// File name of the feedback log inside the log directory
pub const FEEDBACK_LOG_FILE: &str = "ground_truth.jsonl";

/// One served prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    pub model_name: String,
    pub model_version: String,
    pub prediction_id: String,
    pub n_predictions: usize,
    pub inputs: Vec<Vec<f64>>,
    pub outputs: Vec<Vec<f64>>,
    pub n_inputs: usize,
    pub n_outputs: usize,
}

impl PredictionRecord {
    /// Build a record, checking that outputs line up with inputs
    pub fn new(
        inputs: Vec<Vec<f64>>,
        outputs: Vec<Vec<f64>>,
        model_name: impl Into<String>,
        model_version: impl Into<String>,
        n_predictions: usize,
        prediction_id: impl Into<String>,
    ) -> Result<Self> {
        let prediction_id = prediction_id.into();
        check_shape(&prediction_id, &inputs, &outputs)?;
        if let Some(i) = outputs.iter().position(|row| row.len() != n_predictions) {
            return Err(ForecastError::ValidationError(format!(
                "Prediction {}: output row {} has {} values, expected {}",
                prediction_id,
                i,
                outputs[i].len(),
                n_predictions
            )));
        }

        Ok(Self {
            timestamp: Utc::now(),
            model_name: model_name.into(),
            model_version: model_version.into(),
            n_inputs: inputs.len(),
            n_outputs: outputs.len(),
            prediction_id,
            n_predictions,
            inputs,
            outputs,
        })
    }
}

/// Ground truth reported for an earlier prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub prediction_id: String,
    pub inputs: Vec<Vec<f64>>,
    /// Observed values, laid out like the prediction outputs
    pub outputs: Vec<Vec<f64>>,
}

impl FeedbackRecord {
    /// Build a record, checking that true values line up with inputs
    pub fn new(
        inputs: Vec<Vec<f64>>,
        outputs: Vec<Vec<f64>>,
        prediction_id: impl Into<String>,
    ) -> Result<Self> {
        let prediction_id = prediction_id.into();
        if prediction_id.trim().is_empty() {
            return Err(ForecastError::ValidationError(
                "Feedback needs a prediction_id".to_string(),
            ));
        }
        check_shape(&prediction_id, &inputs, &outputs)?;
        if let Some(i) = outputs.iter().position(|row| row.is_empty()) {
            return Err(ForecastError::ValidationError(format!(
                "Feedback {}: output row {} is empty",
                prediction_id, i
            )));
        }

        Ok(Self {
            timestamp: Utc::now(),
            prediction_id,
            inputs,
            outputs,
        })
    }
}

fn check_shape(id: &str, inputs: &[Vec<f64>], outputs: &[Vec<f64>]) -> Result<()> {
    if inputs.is_empty() {
        return Err(ForecastError::ValidationError(format!(
            "Record {} has no input rows",
            id
        )));
    }
    if inputs.len() != outputs.len() {
        return Err(ForecastError::ValidationError(format!(
            "Record {} has {} input rows but {} output rows",
            id,
            inputs.len(),
            outputs.len()
        )));
    }
    Ok(())
}

/// Append-only JSON Lines file of `T` records
#[derive(Debug)]
pub struct JsonlLog<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _record: PhantomData<fn(&T)>,
}

impl<T: Serialize> JsonlLog<T> {
    /// Open a log, creating its parent directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ForecastError::StorageError(format!(
                    "Cannot create log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line
    pub fn append(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        // One write of the whole line, serialized across threads
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.storage_error(e))?;
        file.write_all(&line).map_err(|e| self.storage_error(e))?;
        file.flush().map_err(|e| self.storage_error(e))?;

        debug!(path = %self.path.display(), bytes = line.len(), "appended log record");
        Ok(())
    }

    fn storage_error(&self, e: std::io::Error) -> ForecastError {
        ForecastError::StorageError(format!("Cannot append to {}: {}", self.path.display(), e))
    }
}

/// Prediction and feedback logs living in one directory
#[derive(Debug)]
pub struct EventLogs {
    predictions: JsonlLog<PredictionRecord>,
    feedback: JsonlLog<FeedbackRecord>,
}

impl EventLogs {
    /// Open both logs inside `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            predictions: JsonlLog::open(dir.join(PREDICTION_LOG_FILE))?,
            feedback: JsonlLog::open(dir.join(FEEDBACK_LOG_FILE))?,
        })
    }

    /// Append one served prediction
    pub fn log_prediction(
        &self,
        inputs: Vec<Vec<f64>>,
        outputs: Vec<Vec<f64>>,
        model_name: &str,
        model_version: &str,
        n_predictions: usize,
        prediction_id: &str,
    ) -> Result<PredictionRecord> {
        let record = PredictionRecord::new(
            inputs,
            outputs,
            model_name,
            model_version,
            n_predictions,
            prediction_id,
        )?;
        self.predictions.append(&record)?;
        Ok(record)
    }

    /// Append one ground-truth report
    pub fn log_feedback(
        &self,
        inputs: Vec<Vec<f64>>,
        outputs: Vec<Vec<f64>>,
        prediction_id: &str,
    ) -> Result<FeedbackRecord> {
        let record = FeedbackRecord::new(inputs, outputs, prediction_id)?;
        self.feedback.append(&record)?;
        Ok(record)
    }

    pub fn prediction_log_path(&self) -> &Path {
        self.predictions.path()
    }

    pub fn feedback_log_path(&self) -> &Path {
        self.feedback.path()
    }
}

/// Read every record of a JSON Lines file
///
/// Blank lines are ignored. Lines that do not parse (for example a line torn
/// by a crash) are logged and skipped.
pub fn read_jsonl<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ForecastError::DataUnavailable(format!("{} not found", path.display()))
        } else {
            ForecastError::IoError(e)
        }
    })?;

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                path = %path.display(),
                line = number + 1,
                error = %e,
                "skipping malformed log line"
            ),
        }
    }
    Ok(records)
}

//! Drift and performance monitoring of served forecasts
//!
//! One cycle re-reads the whole prediction log (and the feedback log when it
//! exists), compares it with the reference datasets, writes HTML reports
//! under `<report_dir>/<timestamp>/` and stores a [`MetricsSnapshot`].
//! Cycles share no state beyond the cumulative logs on disk.

use crate::data::ReferenceDataset;
use crate::error::{ForecastError, Result};
use crate::logs::{
    read_jsonl, FeedbackRecord, PredictionRecord, FEEDBACK_LOG_FILE, PREDICTION_LOG_FILE,
};
use crate::storage::{MetricsSnapshot, MetricsStore};
use chrono::{DateTime, Utc};
use consumption_math::{detect_drift, DriftResult, RegressionMetrics};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub mod flatten;
pub mod report;
pub mod scheduler;
pub mod tracking;

pub use flatten::{flatten, join_feedback, row_id, FlatRow, JoinedRow};
pub use scheduler::MonitoringScheduler;
pub use tracking::{MlflowTracking, NoopTracking, TrackingSink};

/// File name of the drift report inside a cycle directory
pub const DRIFT_REPORT_FILE: &str = "data_drift_report.html";

/// File name of the performance report inside a cycle directory
pub const PERF_REPORT_FILE: &str = "performance_report.html";

/// Format of cycle timestamps, used as directory names and snapshot keys
pub const CYCLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Where the pipeline reads its inputs and writes its reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Directory holding the prediction and feedback logs
    pub log_dir: PathBuf,
    /// Directory receiving one sub-directory of reports per cycle
    pub report_dir: PathBuf,
    /// Versioned base path of the drift reference dataset
    pub reference_drift: PathBuf,
    /// Versioned base path of the performance reference dataset
    pub reference_perf: PathBuf,
    /// Seconds between cycles
    pub interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            report_dir: PathBuf::from("reports"),
            reference_drift: PathBuf::from("data/reference/reference_data_drift.csv"),
            reference_perf: PathBuf::from("data/reference/reference_data_perf.csv"),
            interval_secs: 500,
        }
    }
}

impl MonitoringConfig {
    pub fn prediction_log(&self) -> PathBuf {
        self.log_dir.join(PREDICTION_LOG_FILE)
    }

    pub fn feedback_log(&self) -> PathBuf {
        self.log_dir.join(FEEDBACK_LOG_FILE)
    }
}

/// Result of one monitoring cycle
#[derive(Debug, Clone)]
pub struct MonitoringOutcome {
    /// Row stored in the metrics store
    pub snapshot: MetricsSnapshot,
    /// Directory holding this cycle's reports
    pub run_dir: PathBuf,
    pub drift: DriftResult,
    /// Accuracy on predictions with feedback, if there were any
    pub performance: Option<RegressionMetrics>,
    /// Flattened prediction rows used for drift
    pub prediction_rows: usize,
    /// Prediction rows matched with feedback
    pub joined_rows: usize,
}

impl MonitoringOutcome {
    /// Report files written by the cycle
    pub fn report_paths(&self) -> impl Iterator<Item = &Path> + '_ {
        std::iter::once(Path::new(&self.snapshot.drift_report_path))
            .chain(self.snapshot.perf_report_path.as_deref().map(Path::new))
    }
}

/// Drift/performance pipeline writing into a [`MetricsStore`]
#[derive(Debug)]
pub struct MonitoringPipeline {
    config: MonitoringConfig,
    store: Arc<MetricsStore>,
}

impl MonitoringPipeline {
    pub fn new(config: MonitoringConfig, store: Arc<MetricsStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    /// Run one cycle stamped with the current time
    pub fn run_cycle(&self) -> Result<MonitoringOutcome> {
        self.run_cycle_at(Utc::now())
    }

    /// Run one cycle stamped with `now`
    #[instrument(skip(self), fields(log_dir = %self.config.log_dir.display()))]
    pub fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<MonitoringOutcome> {
        let ref_drift = ReferenceDataset::latest(&self.config.reference_drift)?;
        let ref_perf = ReferenceDataset::latest(&self.config.reference_perf)?;

        let predictions: Vec<PredictionRecord> = read_jsonl(self.config.prediction_log())?;
        let first = predictions.first().ok_or_else(|| {
            ForecastError::DataUnavailable(format!(
                "{} holds no predictions",
                self.config.prediction_log().display()
            ))
        })?;
        // All records of a log snapshot are assumed to come from one model
        let (model_name, model_version) = (first.model_name.clone(), first.model_version.clone());

        let flat_predictions = flatten(&predictions);
        let joined = self.joined_feedback(&flat_predictions)?;

        // Drift on every served prediction
        let reference_target = ref_drift.target()?;
        let current_target: Vec<f64> = flat_predictions.iter().map(|r| r.value).collect();
        if current_target.is_empty() {
            return Err(ForecastError::DataUnavailable(format!(
                "{} holds no forecast values to compare",
                self.config.prediction_log().display()
            )));
        }
        let drift = detect_drift(&reference_target, &current_target)?;

        // Performance only on predictions that received feedback
        let performance = if joined.is_empty() {
            None
        } else {
            let targets: Vec<f64> = joined.iter().map(|r| r.target).collect();
            let predicted: Vec<f64> = joined.iter().map(|r| r.prediction).collect();
            Some(RegressionMetrics::evaluate(&targets, &predicted)?)
        };

        let timestamp = now.format(CYCLE_TIMESTAMP_FORMAT).to_string();
        let run_dir = self.create_run_dir(&timestamp)?;
        let drift_header = report::ReportHeader {
            title: "Data drift report",
            generated_at: &timestamp,
            model_name: &model_name,
            model_version: &model_version,
        };

        let drift_path = run_dir.join(DRIFT_REPORT_FILE);
        write_report(
            &drift_path,
            &report::render_drift_report(
                &drift_header,
                &drift,
                &reference_target,
                &current_target,
            )?,
        )?;

        let perf_path = match &performance {
            None => None,
            Some(current) => {
                let (ref_targets, ref_predicted) = ref_perf.target_and_prediction()?;
                let reference = match RegressionMetrics::evaluate(&ref_targets, &ref_predicted) {
                    Ok(metrics) => Some(metrics),
                    Err(e) => {
                        warn!(error = %e, "performance reference cannot be scored");
                        None
                    }
                };

                let path = run_dir.join(PERF_REPORT_FILE);
                write_report(
                    &path,
                    &report::render_performance_report(
                        &report::ReportHeader {
                            title: "Regression performance report",
                            ..drift_header.clone()
                        },
                        reference.as_ref(),
                        current,
                    )?,
                )?;
                Some(path)
            }
        };

        let snapshot = MetricsSnapshot {
            timestamp,
            model_name,
            model_version,
            mae: performance.map(|p| p.mae),
            rmse: performance.map(|p| p.rmse),
            r2: performance.and_then(|p| p.r2),
            drift_score: drift.score,
            drift_report_path: drift_path.display().to_string(),
            perf_report_path: perf_path.map(|p| p.display().to_string()),
        };
        self.store.insert(&snapshot)?;

        info!(
            run_dir = %run_dir.display(),
            drift_score = drift.score,
            drift_detected = drift.drift_detected,
            joined_rows = joined.len(),
            "performance and drift report generated"
        );

        Ok(MonitoringOutcome {
            snapshot,
            run_dir,
            drift,
            performance,
            prediction_rows: flat_predictions.len(),
            joined_rows: joined.len(),
        })
    }

    /// Claim `<report_dir>/<timestamp>/` for this cycle
    ///
    /// Fails when a snapshot or a report directory already exists for the
    /// timestamp, leaving the earlier cycle's reports untouched.
    fn create_run_dir(&self, timestamp: &str) -> Result<PathBuf> {
        if self.store.get(timestamp)?.is_some() {
            return Err(ForecastError::StorageError(format!(
                "A monitoring snapshot already exists for {}",
                timestamp
            )));
        }

        let run_dir = self.config.report_dir.join(timestamp);
        fs::create_dir_all(&self.config.report_dir)
            .and_then(|_| fs::create_dir(&run_dir))
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => ForecastError::StorageError(format!(
                    "Reports already exist in {}",
                    run_dir.display()
                )),
                _ => ForecastError::StorageError(format!(
                    "Cannot create {}: {}",
                    run_dir.display(),
                    e
                )),
            })?;
        Ok(run_dir)
    }

    /// Predictions matched with feedback; empty when no feedback log exists
    fn joined_feedback(&self, flat_predictions: &[FlatRow]) -> Result<Vec<JoinedRow>> {
        let feedback_log = self.config.feedback_log();
        if !feedback_log.exists() {
            info!(path = %feedback_log.display(), "no feedback log yet, skipping performance");
            return Ok(Vec::new());
        }

        let feedback: Vec<FeedbackRecord> = read_jsonl(&feedback_log)?;
        let flat_feedback = flatten(&feedback);
        Ok(join_feedback(flat_predictions, &flat_feedback))
    }
}

fn write_report(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).map_err(|e| {
        ForecastError::StorageError(format!("Cannot write report {}: {}", path.display(), e))
    })
}

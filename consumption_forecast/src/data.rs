//! Reference datasets for drift and performance monitoring
//!
//! A reference dataset holds one row per historical window:
//! `feature_1..feature_W`, the `target` that followed the window and, for
//! the performance reference, the model's `prediction` for that window.
//! Datasets are stored as versioned CSV files:
//! `<base>/<version stamp>/<file name of base>`.

use crate::error::{ForecastError, Result};
use crate::models::{FeatureMatrix, ModelHandle};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the column holding the observed value after each window
pub const TARGET_COLUMN: &str = "target";

/// Name of the column holding the model output for each window
pub const PREDICTION_COLUMN: &str = "prediction";

/// Name of the `index`-th (zero based) feature column
pub fn feature_column(index: usize) -> String {
    format!("feature_{}", index + 1)
}

/// Data loader for tabular CSV files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ForecastError::DataUnavailable(format!("{} not found", path.display()))
            } else {
                ForecastError::IoError(e)
            }
        })?;

        let df = CsvReader::new(file)
            .infer_schema(Some(1000))
            .has_header(true)
            .finish()?;
        Ok(df)
    }

    /// Write a DataFrame as CSV, creating parent directories
    pub fn to_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).has_header(true).finish(df)?;
        Ok(())
    }
}

/// Values of a column cast to f64, nulls kept as `None`
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name).map_err(|_| {
        ForecastError::ValidationError(format!("Column '{}' not found in data", name))
    })?;
    let values = series.cast(&DataType::Float64)?;
    let values = values.f64()?.into_iter().collect();
    Ok(values)
}

/// Build a windowed reference dataset from a consumption column
///
/// Each output row holds `window_size` consecutive values of `target_col`
/// (nulls dropped) and the value that followed them. With `fraction`, that
/// many rows are sampled without replacement; `seed` makes the sample
/// reproducible.
pub fn create_reference_data(
    df: &DataFrame,
    target_col: &str,
    window_size: usize,
    fraction: Option<usize>,
    seed: Option<u64>,
) -> Result<DataFrame> {
    if !df.get_column_names().contains(&target_col) {
        return Err(ForecastError::ValidationError(format!(
            "Target column '{}' not found in data",
            target_col
        )));
    }
    if window_size == 0 {
        return Err(ForecastError::InvalidParameter(
            "Window size must be positive".to_string(),
        ));
    }

    let values: Vec<f64> = numeric_column(df, target_col)?
        .into_iter()
        .flatten()
        .collect();
    if values.len() <= window_size {
        return Err(ForecastError::ValidationError(format!(
            "Need more than {} values to build windows, got {}",
            window_size,
            values.len()
        )));
    }

    let available = values.len() - window_size;
    let starts: Vec<usize> = match fraction {
        Some(amount) if amount < available => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut picked = rand::seq::index::sample(&mut rng, available, amount).into_vec();
            picked.sort_unstable();
            picked
        }
        _ => (0..available).collect(),
    };

    let mut columns: Vec<Series> = (0..window_size)
        .map(|j| {
            let column: Vec<f64> = starts.iter().map(|&s| values[s + j]).collect();
            Series::new(&feature_column(j), column)
        })
        .collect();
    let target: Vec<f64> = starts.iter().map(|&s| values[s + window_size]).collect();
    columns.push(Series::new(TARGET_COLUMN, target));

    Ok(DataFrame::new(columns)?)
}

/// Append a `prediction` column computed by `model` on every window
pub fn add_predictions_to_reference(
    df: &mut DataFrame,
    model: &dyn ModelHandle,
    window_size: usize,
) -> Result<()> {
    let mut columns = Vec::with_capacity(window_size);
    for j in 0..window_size {
        let name = feature_column(j);
        let column = numeric_column(df, &name)?
            .into_iter()
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| {
                ForecastError::ValidationError(format!("Column '{}' contains nulls", name))
            })?;
        columns.push(column);
    }

    let rows: Vec<Vec<f64>> = (0..df.height())
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();
    let features = FeatureMatrix::from_rows(&rows)?;
    let predictions = model.predict(&features)?;
    if predictions.len() != rows.len() {
        return Err(ForecastError::ForecastingError(format!(
            "Model returned {} predictions for {} reference rows",
            predictions.len(),
            rows.len()
        )));
    }

    df.with_column(Series::new(PREDICTION_COLUMN, predictions))?;
    Ok(())
}

/// Version directory name for a dataset written at `at`
pub fn version_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H.%M.%S%.3fZ").to_string()
}

fn base_file_name(base_path: &Path) -> Result<&std::ffi::OsStr> {
    base_path.file_name().ok_or_else(|| {
        ForecastError::InvalidParameter(format!(
            "Versioned dataset path {} has no file name",
            base_path.display()
        ))
    })
}

/// Write `df` as a new version of the dataset at `base_path`
pub fn save_versioned<P: AsRef<Path>>(
    df: &mut DataFrame,
    base_path: P,
    stamp: &str,
) -> Result<PathBuf> {
    let base_path = base_path.as_ref();
    let path = base_path.join(stamp).join(base_file_name(base_path)?);
    DataLoader::to_csv(df, &path)?;
    info!(path = %path.display(), rows = df.height(), "saved versioned dataset");
    Ok(path)
}

/// Most recent version of the dataset at `base_path`
///
/// Versions are ordered by directory name, which sorts chronologically for
/// [`version_stamp`] names.
pub fn latest_versioned_file<P: AsRef<Path>>(base_path: P) -> Result<PathBuf> {
    let base_path = base_path.as_ref();
    let file_name = base_file_name(base_path)?;
    let not_found = || {
        ForecastError::DataUnavailable(format!(
            "No versioned files found for {}",
            base_path.display()
        ))
    };

    if !base_path.is_dir() {
        return Err(not_found());
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(base_path)? {
        let candidate = entry?.path().join(file_name);
        if candidate.is_file() {
            candidates.push(candidate);
        }
    }

    candidates.sort();
    candidates.pop().ok_or_else(not_found)
}

/// A loaded reference dataset
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    df: DataFrame,
    path: Option<PathBuf>,
}

impl ReferenceDataset {
    /// Load a dataset from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let df = DataLoader::from_csv(path)?;
        Ok(Self {
            df,
            path: Some(path.to_path_buf()),
        })
    }

    /// Load the most recent version of a versioned dataset
    pub fn latest<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        Self::from_csv(latest_versioned_file(base_path)?)
    }

    /// Wrap an in-memory DataFrame
    pub fn from_dataframe(df: DataFrame) -> Self {
        Self { df, path: None }
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// File the dataset was read from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Non-null `target` values
    pub fn target(&self) -> Result<Vec<f64>> {
        Ok(numeric_column(&self.df, TARGET_COLUMN)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Non-null `prediction` values
    pub fn prediction(&self) -> Result<Vec<f64>> {
        Ok(numeric_column(&self.df, PREDICTION_COLUMN)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// `(target, prediction)` pairs where both are present
    pub fn target_and_prediction(&self) -> Result<(Vec<f64>, Vec<f64>)> {
        let target = numeric_column(&self.df, TARGET_COLUMN)?;
        let prediction = numeric_column(&self.df, PREDICTION_COLUMN)?;
        Ok(target
            .into_iter()
            .zip(prediction)
            .filter_map(|(t, p)| Some((t?, p?)))
            .unzip())
    }
}

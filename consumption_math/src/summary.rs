//! Descriptive statistics used in monitoring reports

use crate::{check_finite, MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Summary statistics of a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize a non-empty series of finite values
    pub fn of(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot summarize an empty series".to_string(),
            ));
        }
        check_finite(values, "series")?;

        let mut data = Data::new(values.to_vec());

        Ok(Self {
            count: values.len(),
            mean: Statistics::mean(values.iter()),
            std_dev: Statistics::population_std_dev(values.iter()),
            min: Statistics::min(values.iter()),
            q25: data.quantile(0.25),
            median: data.quantile(0.5),
            q75: data.quantile(0.75),
            max: Statistics::max(values.iter()),
        })
    }
}

/// Equal-width bin edges covering both series
pub fn shared_bin_edges(first: &[f64], second: &[f64], bins: usize) -> Result<Vec<f64>> {
    if bins == 0 {
        return Err(MathError::InvalidInput(
            "Number of bins must be greater than zero".to_string(),
        ));
    }

    let (lo, hi) = first
        .iter()
        .chain(second.iter())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return Err(MathError::InsufficientData(
            "Cannot bin empty or non-finite series".to_string(),
        ));
    }

    // Degenerate range: widen so every value lands in a bin
    let (lo, hi) = if hi - lo <= f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    };
    let width = (hi - lo) / bins as f64;

    Ok((0..=bins).map(|i| lo + width * i as f64).collect())
}

/// Share of values falling in each bin defined by `edges`
///
/// The last bin is closed on the right; values outside the edges are ignored.
pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<f64> {
    if edges.len() < 2 || values.is_empty() {
        return Vec::new();
    }

    let bins = edges.len() - 1;
    let mut counts = vec![0usize; bins];
    let first = edges[0];
    let last = edges[bins];

    for &v in values {
        if v < first || v > last {
            continue;
        }
        let idx = edges[1..]
            .iter()
            .position(|&edge| v < edge)
            .unwrap_or(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .map(|c| c as f64 / values.len() as f64)
        .collect()
}

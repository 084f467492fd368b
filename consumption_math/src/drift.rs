//! Two-sample drift tests over a single numeric column
//!
//! Contains the tests used to compare live traffic with a reference sample:
//! - Kolmogorov-Smirnov test with an asymptotic p-value
//! - Wasserstein-1 distance normalised by the reference spread
//!
//! The method is picked from the reference size, small references get the
//! KS test and large ones the normalised distance.

use crate::{check_finite, MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

/// Reference sizes up to this bound are tested with Kolmogorov-Smirnov
pub const KS_MAX_REFERENCE_SIZE: usize = 1000;

/// Drift is reported when the KS p-value falls below this level
pub const KS_P_VALUE_THRESHOLD: f64 = 0.05;

/// Drift is reported when the normalised distance exceeds this value
pub const WASSERSTEIN_THRESHOLD: f64 = 0.1;

/// Lower bound on the reference spread used for normalisation
const MIN_NORM: f64 = 0.001;

/// Statistical test used to detect drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMethod {
    KolmogorovSmirnov,
    Wasserstein,
}

impl DriftMethod {
    /// Pick the test for a reference sample of the given size
    pub fn for_reference_size(size: usize) -> Self {
        if size <= KS_MAX_REFERENCE_SIZE {
            DriftMethod::KolmogorovSmirnov
        } else {
            DriftMethod::Wasserstein
        }
    }

    /// Threshold compared against the drift score
    pub fn threshold(&self) -> f64 {
        match self {
            DriftMethod::KolmogorovSmirnov => KS_P_VALUE_THRESHOLD,
            DriftMethod::Wasserstein => WASSERSTEIN_THRESHOLD,
        }
    }
}

impl fmt::Display for DriftMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriftMethod::KolmogorovSmirnov => write!(f, "K-S p_value"),
            DriftMethod::Wasserstein => write!(f, "Wasserstein distance (normed)"),
        }
    }
}

/// Outcome of a drift test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    pub method: DriftMethod,
    /// Raw test statistic (KS D or normalised distance)
    pub statistic: f64,
    /// Value compared to the threshold (p-value for KS, distance otherwise)
    pub score: f64,
    pub threshold: f64,
    pub drift_detected: bool,
    pub reference_size: usize,
    pub current_size: usize,
}

/// Run the drift test selected from the reference size
pub fn detect_drift(reference: &[f64], current: &[f64]) -> Result<DriftResult> {
    detect_drift_with(
        DriftMethod::for_reference_size(reference.len()),
        reference,
        current,
    )
}

/// Run a specific drift test
pub fn detect_drift_with(
    method: DriftMethod,
    reference: &[f64],
    current: &[f64],
) -> Result<DriftResult> {
    if reference.is_empty() || current.is_empty() {
        return Err(MathError::InsufficientData(format!(
            "Drift test needs two non-empty samples (reference: {}, current: {})",
            reference.len(),
            current.len()
        )));
    }
    check_finite(reference, "reference sample")?;
    check_finite(current, "current sample")?;

    let (statistic, score, drift_detected) = match method {
        DriftMethod::KolmogorovSmirnov => {
            let d = ks_statistic(reference, current);
            let p = ks_p_value(d, reference.len(), current.len());
            (d, p, p < KS_P_VALUE_THRESHOLD)
        }
        DriftMethod::Wasserstein => {
            let distance = wasserstein_distance_norm(reference, current)?;
            (distance, distance, distance >= WASSERSTEIN_THRESHOLD)
        }
    };

    Ok(DriftResult {
        method,
        statistic,
        score,
        threshold: method.threshold(),
        drift_detected,
        reference_size: reference.len(),
        current_size: current.len(),
    })
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Two-sample Kolmogorov-Smirnov statistic D
pub fn ks_statistic(first: &[f64], second: &[f64]) -> f64 {
    let a = sorted(first);
    let b = sorted(second);
    let (n, m) = (a.len() as f64, b.len() as f64);

    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;

    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        // Advance past ties on both sides before comparing the CDFs
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }

    d
}

/// Asymptotic p-value of the two-sample KS statistic
pub fn ks_p_value(d: f64, n: usize, m: usize) -> f64 {
    let en = ((n * m) as f64 / (n + m) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    kolmogorov_survival(lambda)
}

/// Survival function of the Kolmogorov distribution
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    let mut previous_term = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = sign * 2.0 * (-2.0 * jf * jf * lambda * lambda).exp();
        sum += term;
        if term.abs() <= 1e-10 * previous_term || term.abs() <= 1e-12 * sum.abs() {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        previous_term = term.abs();
    }

    // Series failed to converge, which only happens for tiny lambda
    1.0
}

/// First Wasserstein distance between two empirical distributions
pub fn wasserstein_distance(first: &[f64], second: &[f64]) -> f64 {
    let a = sorted(first);
    let b = sorted(second);
    let all = sorted(&[first, second].concat());

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut distance = 0.0;

    for window in all.windows(2) {
        let x = window[0];
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        let delta = window[1] - x;
        distance += (i as f64 / n - j as f64 / m).abs() * delta;
    }

    distance
}

/// Wasserstein distance divided by the reference standard deviation
pub fn wasserstein_distance_norm(reference: &[f64], current: &[f64]) -> Result<f64> {
    if reference.is_empty() || current.is_empty() {
        return Err(MathError::InsufficientData(
            "Wasserstein distance needs two non-empty samples".to_string(),
        ));
    }
    let norm = Statistics::population_std_dev(reference.iter()).max(MIN_NORM);
    Ok(wasserstein_distance(reference, current) / norm)
}

//! Confidence intervals for the outcome's central tendency or proportion.
//!
//! Two estimators are provided:
//!
//! - **Bootstrap** (mean, median): draw `resamples` samples with replacement,
//!   each the size of the input, evaluate the statistic on every resample and
//!   take the `(1 - confidence) / 2` and `(1 + confidence) / 2` percentiles of
//!   the bootstrap distribution.
//! - **Wilson score** (proportion): closed form from successes and trials.
//!
//! The bootstrap draws from a caller-supplied random source so that a fixed
//! seed reproduces the interval bit for bit.

use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{Result, TlError};

use super::summary::{mean, median_in_place, percentile_sorted};

/// Configuration for bootstrap resampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of bootstrap resamples.
    pub resamples: usize,
    /// Two-sided confidence level in (0, 1).
    pub confidence: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: 1000,
            confidence: 0.95,
        }
    }
}

/// Statistic evaluated on each bootstrap resample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStatistic {
    Mean,
    Median,
}

/// How an interval was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalMethod {
    Bootstrap,
    Wilson,
}

/// A two-sided confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub confidence: f64,
    pub method: IntervalMethod,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

fn check_confidence(confidence: f64) -> Result<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(TlError::InvalidParameter(format!(
            "confidence level must be in (0, 1), got {confidence}"
        )))
    }
}

/// Percentile bootstrap interval of `statistic` over `values`.
pub fn bootstrap_interval<R: Rng>(
    values: &[f64],
    statistic: BootstrapStatistic,
    config: &BootstrapConfig,
    rng: &mut R,
) -> Result<ConfidenceInterval> {
    if values.is_empty() {
        return Err(TlError::InsufficientData(
            "bootstrap interval requested for an empty sample".into(),
        ));
    }
    if config.resamples == 0 {
        return Err(TlError::InvalidParameter(
            "bootstrap needs at least one resample".into(),
        ));
    }
    check_confidence(config.confidence)?;

    let n = values.len();
    let mut resample = vec![0.0; n];
    let mut estimates = Vec::with_capacity(config.resamples);

    for _ in 0..config.resamples {
        for slot in resample.iter_mut() {
            *slot = values[rng.random_range(0..n)];
        }
        let estimate = match statistic {
            BootstrapStatistic::Mean => mean(&resample),
            BootstrapStatistic::Median => median_in_place(&mut resample),
        };
        estimates.push(estimate);
    }

    estimates.sort_by(f64::total_cmp);
    let tail = (1.0 - config.confidence) / 2.0 * 100.0;

    Ok(ConfidenceInterval {
        lower: percentile_sorted(&estimates, tail),
        upper: percentile_sorted(&estimates, 100.0 - tail),
        confidence: config.confidence,
        method: IntervalMethod::Bootstrap,
    })
}

/// Wilson score interval for `successes` out of `trials`.
pub fn wilson_interval(successes: f64, trials: usize, confidence: f64) -> Result<ConfidenceInterval> {
    if trials == 0 {
        return Err(TlError::InsufficientData(
            "Wilson interval requested with zero trials".into(),
        ));
    }
    check_confidence(confidence)?;
    if !(0.0..=trials as f64).contains(&successes) {
        return Err(TlError::InvalidParameter(format!(
            "{successes} successes out of {trials} trials"
        )));
    }

    let z = Normal::standard().inverse_cdf(1.0 - (1.0 - confidence) / 2.0);
    let n = trials as f64;
    let p = successes / n;
    let z2 = z * z;

    let denominator = 1.0 + z2 / n;
    let centre = (p + z2 / (2.0 * n)) / denominator;
    let half_width = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denominator;

    // Rounding can push a bound past p at p = 0 or p = 1.
    Ok(ConfidenceInterval {
        lower: (centre - half_width).clamp(0.0, p),
        upper: (centre + half_width).clamp(p, 1.0),
        confidence,
        method: IntervalMethod::Wilson,
    })
}

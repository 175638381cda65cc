use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TlError};

use super::interval::{
    bootstrap_interval, wilson_interval, BootstrapConfig, BootstrapStatistic, ConfidenceInterval,
};
use super::summary::{mean, median};

/// Which outcome statistic a TL graph plots.
///
/// Each kind binds a per-threshold statistic and an interval estimator:
///
/// | kind       | statistic | interval             |
/// |------------|-----------|----------------------|
/// | Mean       | mean      | bootstrap of means   |
/// | Median     | median    | bootstrap of medians |
/// | Proportion | mean      | Wilson score         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    Mean,
    Median,
    Proportion,
}

impl StatisticKind {
    pub const ALL: [StatisticKind; 3] = [
        StatisticKind::Mean,
        StatisticKind::Median,
        StatisticKind::Proportion,
    ];

    /// One-letter graph type code used in parameter files and figure names.
    pub fn code(self) -> char {
        match self {
            StatisticKind::Mean => 'c',
            StatisticKind::Median => 'm',
            StatisticKind::Proportion => 'p',
        }
    }

    /// Y-axis label prefix.
    pub fn label(self) -> &'static str {
        match self {
            StatisticKind::Mean => "Average",
            StatisticKind::Median => "Median",
            StatisticKind::Proportion => "Proportion of patients",
        }
    }

    /// Statistic of an outcome subset. The proportion of a 0/1 outcome is its mean.
    pub fn statistic(self, values: &[f64]) -> f64 {
        match self {
            StatisticKind::Mean | StatisticKind::Proportion => mean(values),
            StatisticKind::Median => median(values),
        }
    }

    /// Confidence interval over the whole outcome sample.
    ///
    /// Only the bootstrap kinds consume `rng`.
    pub fn interval<R: Rng>(
        self,
        values: &[f64],
        bootstrap: &BootstrapConfig,
        rng: &mut R,
    ) -> Result<ConfidenceInterval> {
        match self {
            StatisticKind::Mean => {
                bootstrap_interval(values, BootstrapStatistic::Mean, bootstrap, rng)
            }
            StatisticKind::Median => {
                bootstrap_interval(values, BootstrapStatistic::Median, bootstrap, rng)
            }
            StatisticKind::Proportion => {
                let successes: f64 = values.iter().sum();
                wilson_interval(successes, values.len(), bootstrap.confidence)
            }
        }
    }

    /// Reject outcome samples this kind cannot summarise.
    pub fn validate_outcome(self, column: &str, values: &[f64]) -> Result<()> {
        if self != StatisticKind::Proportion {
            return Ok(());
        }
        match values.iter().find(|v| **v != 0.0 && **v != 1.0) {
            Some(&value) => Err(TlError::NonBinaryOutcome {
                column: column.to_string(),
                value,
            }),
            None => Ok(()),
        }
    }
}

impl FromStr for StatisticKind {
    type Err = TlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "mean" | "average" => Ok(StatisticKind::Mean),
            "m" | "median" => Ok(StatisticKind::Median),
            "p" | "proportion" | "percent" => Ok(StatisticKind::Proportion),
            _ => Err(TlError::InvalidStatisticKind(s.trim().to_string())),
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatisticKind::Mean => "mean",
            StatisticKind::Median => "median",
            StatisticKind::Proportion => "proportion",
        };
        f.write_str(name)
    }
}

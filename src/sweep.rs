//! Threshold sweep: the outcome statistic above and below each threshold of
//! the predictor.
//!
//! # Algorithm
//!
//! 1. Take the predictor range `[min, max]` of the filtered dataset
//! 2. Space [`THRESHOLD_COUNT`] thresholds linearly over it, endpoints included
//! 3. At each threshold `t`, summarise the outcome of rows with predictor
//!    `>= t` ("above") and `<= t` ("below"); a row equal to `t` is in both
//! 4. A side with fewer than `min_n` rows (or none) is undefined
//! 5. One confidence interval is estimated from the whole filtered outcome

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{Result, TlError};
use crate::stats::{BootstrapConfig, ConfidenceInterval, StatisticKind};

/// Number of thresholds in every sweep.
pub const THRESHOLD_COUNT: usize = 20;

/// Statistics at a single threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPoint {
    pub threshold: f64,
    /// Statistic of rows with predictor >= threshold; `None` when undefined.
    pub above: Option<f64>,
    /// Statistic of rows with predictor <= threshold; `None` when undefined.
    pub below: Option<f64>,
    pub n_above: usize,
    pub n_below: usize,
}

/// Full output of one sweep, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSweepResult {
    pub kind: StatisticKind,
    pub points: Vec<ThresholdPoint>,
    /// Interval over the whole filtered outcome, constant across thresholds.
    pub interval: ConfidenceInterval,
    /// Statistic of the whole filtered outcome.
    pub overall: f64,
    /// Rows that entered the sweep.
    pub n: usize,
    pub min_n: usize,
}

impl ThresholdSweepResult {
    pub fn thresholds(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.threshold).collect()
    }

    pub fn above(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.above).collect()
    }

    pub fn below(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.below).collect()
    }

    /// Number of thresholds with at least one defined side.
    pub fn defined_points(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.above.is_some() || p.below.is_some())
            .count()
    }
}

/// `num` evenly spaced values over `[start, stop]`, both ends included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut values: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
            values[num - 1] = stop;
            values
        }
    }
}

/// Sweep `outcome` over thresholds of `predictor`.
///
/// Rows missing either value are ignored. The proportion kind requires a 0/1
/// outcome. `rng` feeds the bootstrap interval only.
pub fn sweep<R: Rng>(
    dataset: &Dataset,
    predictor: &str,
    outcome: &str,
    min_n: usize,
    kind: StatisticKind,
    bootstrap: &BootstrapConfig,
    rng: &mut R,
) -> Result<ThresholdSweepResult> {
    for (role, column) in [("predictor", predictor), ("outcome", outcome)] {
        if !dataset.has_column(column) {
            return Err(TlError::MissingColumn {
                role,
                column: column.to_string(),
            });
        }
    }

    let samples = dataset.numeric_pairs(predictor, outcome)?;
    if samples.is_empty() {
        return Err(TlError::EmptyAfterFiltering);
    }
    let outcomes: Vec<f64> = samples.iter().map(|&(_, y)| y).collect();
    kind.validate_outcome(outcome, &outcomes)?;

    let points = sweep_samples(&samples, min_n, kind);
    let interval = kind.interval(&outcomes, bootstrap, rng)?;
    let overall = kind.statistic(&outcomes);

    log::debug!(
        "Swept {outcome} over {predictor}: n={}, {kind} {overall:.4}, CI [{:.4}, {:.4}]",
        samples.len(),
        interval.lower,
        interval.upper
    );

    Ok(ThresholdSweepResult {
        kind,
        points,
        interval,
        overall,
        n: samples.len(),
        min_n,
    })
}

/// Per-threshold statistics over `(predictor, outcome)` pairs.
pub fn sweep_samples(samples: &[(f64, f64)], min_n: usize, kind: StatisticKind) -> Vec<ThresholdPoint> {
    if samples.is_empty() {
        return Vec::new();
    }
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
            (lo.min(x), hi.max(x))
        });

    let mut above = Vec::with_capacity(samples.len());
    let mut below = Vec::with_capacity(samples.len());

    linspace(min, max, THRESHOLD_COUNT)
        .into_iter()
        .map(|threshold| {
            above.clear();
            below.clear();
            for &(x, y) in samples {
                if x >= threshold {
                    above.push(y);
                }
                if x <= threshold {
                    below.push(y);
                }
            }
            ThresholdPoint {
                threshold,
                above: side_statistic(&above, min_n, kind),
                below: side_statistic(&below, min_n, kind),
                n_above: above.len(),
                n_below: below.len(),
            }
        })
        .collect()
}

fn side_statistic(values: &[f64], min_n: usize, kind: StatisticKind) -> Option<f64> {
    if values.is_empty() || values.len() < min_n {
        None
    } else {
        Some(kind.statistic(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(0)
    }

    #[test]
    fn test_linspace_endpoints() {
        let t = linspace(40.0, 90.0, THRESHOLD_COUNT);
        assert_eq!(t.len(), 20);
        assert_eq!(t[0], 40.0);
        assert_eq!(t[19], 90.0);
        let step = 50.0 / 19.0;
        for (i, v) in t.iter().enumerate() {
            assert!((v - (40.0 + i as f64 * step)).abs() < 1e-9);
        }
        assert_eq!(linspace(3.0, 3.0, 4), vec![3.0; 4]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_boundary_rows_count_on_both_sides() {
        // Thresholds over [0, 19] with step 1 land exactly on every predictor value.
        let samples: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, i as f64)).collect();
        let points = sweep_samples(&samples, 1, StatisticKind::Mean);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.threshold, i as f64);
            assert_eq!(p.n_above, 20 - i);
            assert_eq!(p.n_below, i + 1);
            assert_eq!(p.n_above + p.n_below, 21);
        }
        assert_eq!(points[0].below, Some(0.0));
        assert_eq!(points[19].above, Some(19.0));
    }

    #[test]
    fn test_min_n_marks_sides_undefined() {
        let samples: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, 1.0)).collect();
        let points = sweep_samples(&samples, 5, StatisticKind::Mean);
        for p in &points {
            assert_eq!(p.above.is_some(), p.n_above >= 5);
            assert_eq!(p.below.is_some(), p.n_below >= 5);
        }
        assert!(points[19].above.is_none());
        assert!(points[0].below.is_none());

        let all_undefined = sweep_samples(&samples, 21, StatisticKind::Mean);
        assert!(all_undefined.iter().all(|p| p.above.is_none() && p.below.is_none()));

        let zero_floor = sweep_samples(&samples, 0, StatisticKind::Mean);
        assert!(zero_floor.iter().all(|p| p.above.is_some() && p.below.is_some()));
    }

    #[test]
    fn test_constant_predictor_is_degenerate() {
        let ds = Dataset::from_columns(&[
            ("age", &[60.0; 8]),
            ("died", &[0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
        ]);
        let result = sweep(
            &ds,
            "age",
            "died",
            1,
            StatisticKind::Proportion,
            &BootstrapConfig::default(),
            &mut rng(),
        )
        .unwrap();
        assert_eq!(result.points.len(), THRESHOLD_COUNT);
        for p in &result.points {
            assert_eq!(p.threshold, 60.0);
            assert_eq!((p.n_above, p.n_below), (8, 8));
            assert_eq!(p.above, Some(0.375));
            assert_eq!(p.below, Some(0.375));
        }
    }

    #[test]
    fn test_sweep_interval_from_whole_outcome() {
        let ages: Vec<f64> = (0..50).map(|i| 40.0 + i as f64).collect();
        let pain: Vec<f64> = (0..50).map(|i| (i % 7) as f64 * 2.0).collect();
        let ds = Dataset::from_columns(&[("age", &ages), ("pain", &pain)]);
        let result = sweep(
            &ds,
            "age",
            "pain",
            10,
            StatisticKind::Median,
            &BootstrapConfig::default(),
            &mut rng(),
        )
        .unwrap();
        assert_eq!(result.n, 50);
        assert_eq!(result.overall, crate::stats::summary::median(&pain));
        assert!(result.interval.lower <= result.interval.upper);
        assert_eq!(result.thresholds().first(), Some(&40.0));
        assert_eq!(result.thresholds().last(), Some(&89.0));
    }

    #[test]
    fn test_sweep_reproducible() {
        let ages: Vec<f64> = (0..30).map(|i| 40.0 + (i * 13 % 50) as f64).collect();
        let score: Vec<f64> = (0..30).map(|i| (i * 7 % 11) as f64).collect();
        let ds = Dataset::from_columns(&[("age", &ages), ("score", &score)]);
        let run = || {
            sweep(
                &ds,
                "age",
                "score",
                3,
                StatisticKind::Mean,
                &BootstrapConfig::default(),
                &mut rng(),
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_sweep_errors() {
        let ds = Dataset::from_columns(&[("age", &[50.0, 60.0]), ("died", &[0.0, 2.0])]);
        let config = BootstrapConfig::default();

        let err = sweep(&ds, "bmi", "died", 1, StatisticKind::Mean, &config, &mut rng()).unwrap_err();
        assert!(matches!(err, TlError::MissingColumn { role: "predictor", .. }));

        let err = sweep(&ds, "age", "died", 1, StatisticKind::Proportion, &config, &mut rng())
            .unwrap_err();
        assert!(matches!(err, TlError::NonBinaryOutcome { .. }));

        let empty = ds.filter_rows(|_| false);
        let err = sweep(&empty, "age", "died", 1, StatisticKind::Mean, &config, &mut rng())
            .unwrap_err();
        assert!(matches!(err, TlError::EmptyAfterFiltering));
    }

    proptest! {
        #[test]
        fn prop_threshold_grid_and_monotone_counts(
            samples in proptest::collection::vec((-1.0e3f64..1.0e3, 0.0f64..100.0), 1..80),
            min_n in 0usize..100,
        ) {
            let points = sweep_samples(&samples, min_n, StatisticKind::Mean);
            let min = samples.iter().map(|s| s.0).fold(f64::INFINITY, f64::min);
            let max = samples.iter().map(|s| s.0).fold(f64::NEG_INFINITY, f64::max);

            prop_assert_eq!(points.len(), THRESHOLD_COUNT);
            prop_assert_eq!(points[0].threshold, min);
            prop_assert_eq!(points[THRESHOLD_COUNT - 1].threshold, max);

            for pair in points.windows(2) {
                prop_assert!(pair[0].threshold <= pair[1].threshold);
                prop_assert!(pair[0].n_above >= pair[1].n_above);
                prop_assert!(pair[0].n_below <= pair[1].n_below);
            }
            for p in &points {
                prop_assert_eq!(p.above.is_some(), p.n_above > 0 && p.n_above >= min_n);
                prop_assert_eq!(p.below.is_some(), p.n_below > 0 && p.n_below >= min_n);
            }
        }
    }
}

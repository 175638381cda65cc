//! Batch processing of graph requests.
//!
//! Every graph is processed independently: a configuration problem, an
//! unreadable dataset or an empty filtered dataset skips that graph, a defect
//! fails it, and the batch always moves on. Each graph draws from its own
//! random source seeded with `seed + index`, so parallel and sequential runs
//! produce identical results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{apply_filters, loader, Dataset};
use crate::error::{Disposition, Result, TlError};
use crate::graph::{AxisBounds, GraphRequest, GraphSpec};
use crate::stats::BootstrapConfig;
use crate::sweep::{sweep, ThresholdSweepResult};

/// Configuration for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Base seed; graph `i` uses `seed + i`.
    pub seed: u64,
    pub bootstrap: BootstrapConfig,
    /// Process graphs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            bootstrap: BootstrapConfig::default(),
            parallel: true,
        }
    }
}

/// A computed TL graph, handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct TlGraph {
    pub spec: GraphSpec,
    pub result: ThresholdSweepResult,
    /// Filters ignored because their variable is not in the dataset.
    pub skipped_filters: Vec<String>,
}

impl TlGraph {
    pub fn title(&self) -> String {
        self.spec.title()
    }

    pub fn y_label(&self) -> String {
        self.spec.y_label()
    }

    pub fn x_label(&self) -> String {
        self.spec.x_label()
    }

    pub fn y_bounds(&self) -> Option<AxisBounds> {
        self.spec.effective_y_bounds()
    }

    pub fn figure_name(&self) -> String {
        self.spec.figure_name()
    }
}

/// What happened to one graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphOutcome {
    Computed(TlGraph),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphReport {
    /// Position of the graph in the batch.
    pub index: usize,
    /// Figure name, or the row number when the request itself was invalid.
    pub name: String,
    pub outcome: GraphOutcome,
}

impl GraphReport {
    pub fn graph(&self) -> Option<&TlGraph> {
        match &self.outcome {
            GraphOutcome::Computed(graph) => Some(graph),
            _ => None,
        }
    }
}

/// Counts of each outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub computed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn of(reports: &[GraphReport]) -> Self {
        reports
            .iter()
            .fold(Self::default(), |mut acc, report| {
                match report.outcome {
                    GraphOutcome::Computed(_) => acc.computed += 1,
                    GraphOutcome::Skipped(_) => acc.skipped += 1,
                    GraphOutcome::Failed(_) => acc.failed += 1,
                }
                acc
            })
    }
}

// ---------------------------------------------------------------------------
// Single graph
// ---------------------------------------------------------------------------

/// Filter `dataset` and sweep it for one graph.
pub fn process_graph<R: Rng>(
    dataset: &Dataset,
    spec: &GraphSpec,
    bootstrap: &BootstrapConfig,
    rng: &mut R,
) -> Result<TlGraph> {
    spec.validate()?;
    for (role, column) in [("outcome", &spec.outcome), ("predictor", &spec.predictor)] {
        if !dataset.has_column(column) {
            return Err(TlError::MissingColumn {
                role,
                column: column.clone(),
            });
        }
    }

    let filtered = apply_filters(dataset, &spec.filters);
    let complete = filtered
        .dataset
        .drop_missing(&[spec.predictor.as_str(), spec.outcome.as_str()]);
    if complete.is_empty() {
        return Err(TlError::EmptyAfterFiltering);
    }

    let result = sweep(
        &complete,
        &spec.predictor,
        &spec.outcome,
        spec.min_n,
        spec.kind,
        bootstrap,
        rng,
    )?;

    Ok(TlGraph {
        spec: spec.clone(),
        result,
        skipped_filters: filtered.skipped,
    })
}

// ---------------------------------------------------------------------------
// Dataset cache
// ---------------------------------------------------------------------------

/// Datasets loaded once per batch, keyed by path. Load failures are kept so
/// every graph reading that file reports the same reason.
#[derive(Debug, Default)]
pub struct DatasetCache {
    datasets: HashMap<PathBuf, std::result::Result<Arc<Dataset>, String>>,
}

impl DatasetCache {
    pub fn load<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Self {
        let mut cache = Self::default();
        for path in paths {
            if cache.datasets.contains_key(path) {
                continue;
            }
            let entry = if path.exists() {
                loader::load_file(path)
                    .map(Arc::new)
                    .map_err(|e| format!("{e:#}"))
            } else {
                Err("file does not exist".to_string())
            };
            if let Err(message) = &entry {
                log::error!("Cannot load dataset {}: {message}", path.display());
            }
            cache.datasets.insert(path.to_path_buf(), entry);
        }
        cache
    }

    /// Number of distinct dataset files, loaded or not.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Insert an already loaded dataset.
    pub fn insert(&mut self, path: impl Into<PathBuf>, dataset: Dataset) {
        self.datasets.insert(path.into(), Ok(Arc::new(dataset)));
    }

    pub fn get(&self, path: &Path) -> Result<Arc<Dataset>> {
        match self.datasets.get(path) {
            Some(Ok(dataset)) => Ok(Arc::clone(dataset)),
            Some(Err(message)) => Err(TlError::DatasetLoad {
                path: path.display().to_string(),
                message: message.clone(),
            }),
            None => Err(TlError::DatasetLoad {
                path: path.display().to_string(),
                message: "dataset was not loaded".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Process every request, loading each dataset file once.
pub fn run_batch(requests: &[GraphRequest], config: &BatchConfig) -> Vec<GraphReport> {
    let cache = DatasetCache::load(requests.iter().map(|r| r.data_file.as_path()));
    run_with_cache(requests, &cache, config)
}

/// Process requests against pre-loaded datasets.
pub fn run_with_cache(
    requests: &[GraphRequest],
    cache: &DatasetCache,
    config: &BatchConfig,
) -> Vec<GraphReport> {
    let run = |(index, request): (usize, &GraphRequest)| run_one(index, Ok(request), cache, config);
    if config.parallel {
        requests.par_iter().enumerate().map(run).collect()
    } else {
        requests.iter().enumerate().map(run).collect()
    }
}

/// Process parsed parameter rows. Rows that do not form a valid request are
/// reported as skipped in place.
pub fn run_requests(jobs: &[Result<GraphRequest>], config: &BatchConfig) -> Vec<GraphReport> {
    let cache = DatasetCache::load(
        jobs.iter()
            .filter_map(|job| job.as_ref().ok())
            .map(|r| r.data_file.as_path()),
    );
    let run = |(index, job): (usize, &Result<GraphRequest>)| {
        run_one(index, job.as_ref(), &cache, config)
    };
    if config.parallel {
        jobs.par_iter().enumerate().map(run).collect()
    } else {
        jobs.iter().enumerate().map(run).collect()
    }
}

fn run_one(
    index: usize,
    job: std::result::Result<&GraphRequest, &TlError>,
    cache: &DatasetCache,
    config: &BatchConfig,
) -> GraphReport {
    let request = match job {
        Ok(request) => request,
        Err(err) => {
            let name = format!("row {}", index + 1);
            log::warn!("Skipping {name}: {err}");
            return GraphReport {
                index,
                name,
                outcome: outcome_for_error(err),
            };
        }
    };

    let name = request.spec.figure_name();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed.wrapping_add(index as u64));
    let processed = cache
        .get(&request.data_file)
        .and_then(|dataset| process_graph(&dataset, &request.spec, &config.bootstrap, &mut rng));

    let outcome = match processed {
        Ok(graph) => {
            log::info!(
                "Computed {name}: n={}, {} thresholds defined",
                graph.result.n,
                graph.result.defined_points()
            );
            GraphOutcome::Computed(graph)
        }
        Err(err) => {
            let outcome = outcome_for_error(&err);
            match outcome {
                GraphOutcome::Failed(_) => log::error!("Failed {name}: {err}"),
                _ => log::warn!("Skipping {name}: {err}"),
            }
            outcome
        }
    };

    GraphReport {
        index,
        name,
        outcome,
    }
}

fn outcome_for_error(err: &TlError) -> GraphOutcome {
    match err.disposition() {
        Disposition::Skip => GraphOutcome::Skipped(err.to_string()),
        Disposition::Fail => GraphOutcome::Failed(err.to_string()),
    }
}

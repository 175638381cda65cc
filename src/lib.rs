//! Threshold Limit (TL) graphs.
//!
//! A TL graph shows how an outcome behaves in patients above and below a
//! sliding threshold of a predictor: for 20 thresholds spanning the
//! predictor's range it plots the mean, median or proportion of the outcome
//! on each side, against a confidence band for the whole filtered cohort.
//!
//! ```text
//! params file ──► GraphRequest ──► DatasetCache ──► apply_filters ──► sweep ──► TlGraph ──► ChartRenderer
//!                 (graph.rs)        (batch.rs)      (data/filter)   (sweep.rs)
//! ```
//!
//! Graphs are independent: [`batch::run_requests`] reports each as
//! computed, skipped or failed and never aborts the batch.

pub mod batch;
pub mod data;
pub mod error;
pub mod graph;
pub mod render;
pub mod stats;
pub mod sweep;

pub use batch::{
    process_graph, run_batch, run_requests, BatchConfig, BatchSummary, GraphOutcome, GraphReport,
    TlGraph,
};
pub use error::{Disposition, Result, TlError};
pub use graph::{load_graph_params, AxisBounds, GraphRequest, GraphSpec, PlotSide};
pub use render::{render_all, ChartRenderer, SummaryRenderer};
pub use stats::{BootstrapConfig, ConfidenceInterval, StatisticKind};
pub use sweep::{sweep, ThresholdPoint, ThresholdSweepResult, THRESHOLD_COUNT};

mod app;
mod state;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::Context;
use app::TlViewerApp;
use clap::Parser;
use eframe::egui;
use state::AppState;
use tl_graph::{
    load_graph_params, render_all, run_requests, BatchConfig, BatchSummary, BootstrapConfig,
    SummaryRenderer,
};

/// Compute Threshold Limit graphs from a parameter file and show them.
#[derive(Parser, Debug)]
#[command(name = "tl-graph", version, about)]
struct Args {
    /// Graph parameter file (.csv or .json), one graph per row
    params: Option<PathBuf>,

    /// Base seed for bootstrap resampling; graph i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Bootstrap resamples per interval
    #[arg(long, default_value_t = 1000)]
    resamples: usize,

    /// Confidence level of the intervals
    #[arg(long, default_value_t = 0.95)]
    confidence: f64,

    /// Process graphs one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Print graph tables to stdout instead of opening the viewer
    #[arg(long, requires = "params")]
    headless: bool,
}

impl Args {
    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            seed: self.seed,
            bootstrap: BootstrapConfig {
                resamples: self.resamples,
                confidence: self.confidence,
            },
            parallel: !self.sequential,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.batch_config();

    match (&args.params, args.headless) {
        (Some(path), true) => run_headless(path, &config),
        (params, _) => run_viewer(params.clone(), config),
    }
}

fn run_headless(path: &Path, config: &BatchConfig) -> anyhow::Result<()> {
    let params = load_graph_params(path)
        .with_context(|| format!("Failed to read parameter file {}", path.display()))?;
    let reports = run_requests(&params.requests(), config);

    let stdout = std::io::stdout();
    let mut renderer = SummaryRenderer::new(stdout.lock());
    render_all(&mut renderer, &reports);
    renderer.write_problems(&reports)?;

    let summary = BatchSummary::of(&reports);
    log::info!(
        "{} graphs: {} computed, {} skipped, {} failed",
        reports.len(),
        summary.computed,
        summary.skipped,
        summary.failed
    );
    Ok(())
}

fn run_viewer(params: Option<PathBuf>, config: BatchConfig) -> anyhow::Result<()> {
    let mut state = AppState::new(config);
    if let Some(path) = &params {
        state.load_params(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "TL Graph Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(TlViewerApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

use std::path::{Path, PathBuf};

use tl_graph::{
    load_graph_params, render_all, run_requests, BatchConfig, BatchSummary, ChartRenderer,
    GraphReport, TlGraph,
};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct AppState {
    /// Settings every batch runs with.
    pub config: BatchConfig,

    /// Parameter file of the current batch (None until one is opened).
    pub params_path: Option<PathBuf>,

    /// Per-graph outcome of the current batch, in parameter file order.
    pub reports: Vec<GraphReport>,

    /// Graphs handed over for display.
    pub charts: Vec<TlGraph>,

    /// Index into `reports` of the graph shown in the central panel.
    pub selected: Option<usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            params_path: None,
            reports: Vec::new(),
            charts: Vec::new(),
            selected: None,
            status_message: None,
        }
    }

    /// Read a parameter file and compute every graph in it.
    pub fn load_params(&mut self, path: &Path) {
        self.reports.clear();
        self.charts.clear();
        self.selected = None;
        self.params_path = Some(path.to_path_buf());

        let params = match load_graph_params(path) {
            Ok(params) => params,
            Err(e) => {
                log::error!("Failed to read parameter file {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
                return;
            }
        };

        let reports = run_requests(&params.requests(), &self.config);
        render_all(self, &reports);
        self.selected = reports.iter().position(|r| r.graph().is_some());
        self.reports = reports;

        let summary = self.summary();
        self.status_message = (summary.skipped + summary.failed > 0).then(|| {
            format!(
                "{} graph(s) skipped, {} failed",
                summary.skipped, summary.failed
            )
        });
    }

    /// Recompute the current parameter file, e.g. after it was edited.
    pub fn reload(&mut self) {
        if let Some(path) = self.params_path.clone() {
            self.load_params(&path);
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::of(&self.reports)
    }

    /// Viewer window title: the selected graph's title, if any.
    pub fn window_title(&self) -> String {
        match self.selected_chart() {
            Some(graph) => format!("{} - TL Graph Viewer", graph.title()),
            None => "TL Graph Viewer".to_string(),
        }
    }

    pub fn selected_report(&self) -> Option<&GraphReport> {
        self.selected.and_then(|i| self.reports.get(i))
    }

    /// Chart of the selected graph, if it was computed.
    pub fn selected_chart(&self) -> Option<&TlGraph> {
        let selected = self.selected?;
        self.reports.get(selected)?.graph()?;
        // Charts arrive in report order, one per computed graph.
        let rank = self.reports[..selected]
            .iter()
            .filter(|r| r.graph().is_some())
            .count();
        self.charts.get(rank)
    }
}

impl ChartRenderer for AppState {
    fn render(&mut self, graph: &TlGraph) -> anyhow::Result<()> {
        self.charts.push(graph.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_params_collects_charts() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = std::fs::File::create(dir.path().join("cohort.csv")).unwrap();
        writeln!(data, "age,died,sex").unwrap();
        for i in 0..30 {
            writeln!(data, "{},{},2", 40 + i, i % 2).unwrap();
        }
        drop(data);
        std::fs::write(
            dir.path().join("graphs.csv"),
            "excel_file,outcome,variable,filter1,f1op,f1criteria,plot_type,min_n,graphtype\n\
             cohort.csv,died,age,,,,3,5,p\n\
             cohort.csv,died,age,sex,==,1,3,5,p\n",
        )
        .unwrap();

        let mut state = AppState::new(BatchConfig::default());
        state.load_params(&dir.path().join("graphs.csv"));

        assert_eq!(state.reports.len(), 2);
        assert_eq!(state.charts.len(), 1);
        assert_eq!(state.selected, Some(0));
        assert!(state.selected_chart().is_some());
        assert_eq!(state.window_title(), "died by age Threshold - TL Graph Viewer");
        state.selected = Some(1);
        assert_eq!(state.window_title(), "TL Graph Viewer");
        state.selected = Some(0);
        assert_eq!(
            state.status_message.as_deref(),
            Some("1 graph(s) skipped, 0 failed")
        );
    }

    #[test]
    fn test_load_params_reports_unreadable_file() {
        let mut state = AppState::new(BatchConfig::default());
        state.load_params(Path::new("graphs.txt"));
        assert!(state.reports.is_empty());
        assert_eq!(state.window_title(), "TL Graph Viewer");
        assert!(state.status_message.unwrap().starts_with("Error"));
    }
}

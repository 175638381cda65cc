//! Rendering collaborators.
//!
//! A renderer receives finished [`TlGraph`]s; it never sees skipped or
//! failed graphs. The interactive viewer lives in the binary, the text
//! renderer here is used for headless runs.

use std::io::Write;

use crate::batch::{GraphOutcome, GraphReport, TlGraph};

/// Something that can display or store a computed TL graph.
pub trait ChartRenderer {
    fn render(&mut self, graph: &TlGraph) -> anyhow::Result<()>;
}

/// Hand every computed graph to `renderer`. A rendering error is logged and
/// does not stop the remaining graphs. Returns the number rendered.
pub fn render_all<R: ChartRenderer + ?Sized>(renderer: &mut R, reports: &[GraphReport]) -> usize {
    let mut rendered = 0;
    for report in reports {
        let Some(graph) = report.graph() else {
            continue;
        };
        match renderer.render(graph) {
            Ok(()) => rendered += 1,
            Err(e) => log::error!("Failed to render {}: {e:#}", report.name),
        }
    }
    rendered
}

/// Writes each graph as a plain-text table.
pub struct SummaryRenderer<W: Write> {
    out: W,
}

impl<W: Write> SummaryRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// One line per skipped or failed graph.
    pub fn write_problems(&mut self, reports: &[GraphReport]) -> anyhow::Result<()> {
        for report in reports {
            match &report.outcome {
                GraphOutcome::Computed(_) => {}
                GraphOutcome::Skipped(reason) => {
                    writeln!(self.out, "skipped {}: {reason}", report.name)?
                }
                GraphOutcome::Failed(reason) => {
                    writeln!(self.out, "FAILED  {}: {reason}", report.name)?
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> ChartRenderer for SummaryRenderer<W> {
    fn render(&mut self, graph: &TlGraph) -> anyhow::Result<()> {
        let spec = &graph.spec;
        let result = &graph.result;
        let out = &mut self.out;

        writeln!(out, "== {} ({}) ==", graph.title(), graph.figure_name())?;
        writeln!(out, "{}; {}", graph.x_label(), graph.y_label())?;
        for filter in spec.filters.iter().filter(|f| f.is_active()) {
            writeln!(out, "filter: {filter}")?;
        }
        for column in &graph.skipped_filters {
            writeln!(out, "filter on '{column}' ignored: column not in dataset")?;
        }
        writeln!(
            out,
            "n = {}, min_n = {}, overall {} = {:.4}, {:.0}% CI [{:.4}, {:.4}]",
            result.n,
            result.min_n,
            result.kind,
            result.overall,
            result.interval.confidence * 100.0,
            result.interval.lower,
            result.interval.upper
        )?;

        writeln!(
            out,
            "{:>12} {:>12} {:>8} {:>12} {:>8}",
            "threshold", "above", "n_above", "below", "n_below"
        )?;
        for point in &result.points {
            writeln!(
                out,
                "{:>12.4} {:>12} {:>8} {:>12} {:>8}",
                point.threshold,
                cell(spec.plot_side.shows_above(), point.above),
                point.n_above,
                cell(spec.plot_side.shows_below(), point.below),
                point.n_below
            )?;
        }
        writeln!(out)?;
        Ok(())
    }
}

fn cell(shown: bool, value: Option<f64>) -> String {
    match (shown, value) {
        (false, _) => "-".to_string(),
        (true, Some(v)) => format!("{v:.4}"),
        (true, None) => "undefined".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::process_graph;
    use crate::data::Dataset;
    use crate::graph::{GraphSpec, PlotSide};
    use crate::stats::{BootstrapConfig, StatisticKind};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    struct Failing;

    impl ChartRenderer for Failing {
        fn render(&mut self, _graph: &TlGraph) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn graph(side: PlotSide) -> TlGraph {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = (0..10).map(|i| f64::from(i % 2)).collect();
        let dataset = Dataset::from_columns(&[("age", &x), ("died", &y)]);
        let spec = GraphSpec::new("died", "age", StatisticKind::Proportion)
            .with_labels("Died", "Age")
            .with_plot_side(side)
            .with_min_n(3);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        process_graph(&dataset, &spec, &BootstrapConfig::default(), &mut rng).unwrap()
    }

    fn report(index: usize, outcome: GraphOutcome) -> GraphReport {
        GraphReport {
            index,
            name: format!("g{index}"),
            outcome,
        }
    }

    #[test]
    fn test_summary_table() {
        let mut renderer = SummaryRenderer::new(Vec::new());
        renderer.render(&graph(PlotSide::AboveOnly)).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(text.starts_with("== Died by Age Threshold (age_p_died_plot1.png) =="));
        assert!(text.contains("Threshold level of Age; Proportion of patients Died"));
        assert!(text.contains("n = 10, min_n = 3"));
        // Header, then 20 thresholds.
        let rows = text.lines().skip_while(|l| !l.contains("threshold")).skip(1);
        let rows: Vec<&str> = rows.filter(|l| !l.is_empty()).collect();
        assert_eq!(rows.len(), 20);
        // The last threshold has one row above it, fewer than min_n.
        assert!(rows[19].contains("undefined"));
        assert!(rows.iter().all(|r| r.contains(" - ")));
    }

    #[test]
    fn test_render_all_continues_after_error() {
        let reports = vec![
            report(0, GraphOutcome::Computed(graph(PlotSide::Both))),
            report(1, GraphOutcome::Skipped("empty".into())),
            report(2, GraphOutcome::Computed(graph(PlotSide::BelowOnly))),
        ];
        assert_eq!(render_all(&mut Failing, &reports), 0);

        let mut renderer = SummaryRenderer::new(Vec::new());
        assert_eq!(render_all(&mut renderer, &reports), 2);
        renderer.write_problems(&reports).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("skipped g1: empty"));
    }
}

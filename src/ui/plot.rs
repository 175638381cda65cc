use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotPoints, Points, Polygon};

use crate::state::AppState;

const ABOVE_COLOR: Color32 = Color32::from_rgb(31, 119, 180);
const BELOW_COLOR: Color32 = Color32::from_rgb(214, 39, 40);
const BAND_COLOR: Color32 = Color32::from_rgba_premultiplied(26, 0, 26, 51);

// ---------------------------------------------------------------------------
// TL plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected graph in the central panel.
pub fn tl_plot(ui: &mut Ui, state: &AppState) {
    let graph = match state.selected_chart() {
        Some(graph) => graph,
        None => {
            let message = match state.selected_report() {
                Some(report) => format!("{} was not computed", report.name),
                None => "Open a parameter file to view TL graphs  (File → Open parameters…)".into(),
            };
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading(message);
            });
            return;
        }
    };

    let spec = &graph.spec;
    let result = &graph.result;

    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(graph.title());
        ui.label(
            RichText::new(format!(
                "n = {}  ·  min n = {}  ·  {:.0}% CI [{:.3}, {:.3}]",
                result.n,
                result.min_n,
                result.interval.confidence * 100.0,
                result.interval.lower,
                result.interval.upper
            ))
            .weak(),
        );
    });

    let mut plot = Plot::new(graph.figure_name())
        .legend(Legend::default())
        .x_axis_label(graph.x_label())
        .y_axis_label(graph.y_label())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if let Some(bounds) = graph.y_bounds() {
        plot = plot.default_y_bounds(bounds.lower, bounds.upper);
    }

    plot.show(ui, |plot_ui| {
        let thresholds = result.thresholds();

        if let (Some(&first), Some(&last)) = (thresholds.first(), thresholds.last()) {
            let band = vec![
                [first, result.interval.lower],
                [last, result.interval.lower],
                [last, result.interval.upper],
                [first, result.interval.upper],
            ];
            plot_ui.polygon(
                Polygon::new(
                    format!("{:.0}% CI", result.interval.confidence * 100.0),
                    PlotPoints::from(band),
                )
                    .fill_color(BAND_COLOR)
                    .stroke(Stroke::NONE),
            );
        }

        let curves = [
            (
                spec.plot_side.shows_above(),
                "Above threshold",
                result.above(),
                ABOVE_COLOR,
                MarkerShape::Right,
            ),
            (
                spec.plot_side.shows_below(),
                "Below threshold",
                result.below(),
                BELOW_COLOR,
                MarkerShape::Left,
            ),
        ];
        for (shown, name, values, color, marker) in curves {
            if !shown {
                continue;
            }
            for segment in segments(&thresholds, &values) {
                plot_ui.points(
                    Points::new(name, PlotPoints::from(segment.clone()))
                        .color(color)
                        .shape(marker)
                        .radius(4.0)
                        .filled(false),
                );
                plot_ui.line(
                    Line::new(name, PlotPoints::from(segment))
                        .color(color)
                        .width(1.5),
                );
            }
        }
    });
}

/// Split a curve into runs of defined values; undefined thresholds leave gaps.
pub fn segments(thresholds: &[f64], values: &[Option<f64>]) -> Vec<Vec<[f64; 2]>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (&x, value) in thresholds.iter().zip(values) {
        match value {
            Some(y) => current.push([x, *y]),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

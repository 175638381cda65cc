use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use tl_graph::GraphOutcome;

use crate::state::AppState;

const SKIPPED_COLOR: Color32 = Color32::from_rgb(230, 160, 30);

// ---------------------------------------------------------------------------
// Left side panel – graph list
// ---------------------------------------------------------------------------

/// Render the left panel: one entry per graph of the batch.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Graphs");
    ui.separator();

    if state.reports.is_empty() {
        ui.label("No parameter file loaded.");
        return;
    }

    let mut clicked = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for report in &state.reports {
                let (text, reason) = match &report.outcome {
                    GraphOutcome::Computed(_) => (RichText::new(&report.name), None),
                    GraphOutcome::Skipped(reason) => (
                        RichText::new(&report.name).color(SKIPPED_COLOR),
                        Some(format!("Skipped: {reason}")),
                    ),
                    GraphOutcome::Failed(reason) => (
                        RichText::new(&report.name).color(Color32::RED).strong(),
                        Some(format!("Failed: {reason}")),
                    ),
                };

                let mut response =
                    ui.selectable_label(state.selected == Some(report.index), text);
                if let Some(reason) = &reason {
                    response = response.on_hover_text(reason.as_str());
                }
                if response.clicked() {
                    clicked = Some(report.index);
                }
            }

            ui.separator();
            selected_details(ui, state);
        });

    if clicked.is_some() {
        state.selected = clicked;
    }
}

/// Filters, exclusions and problems of the selected graph.
fn selected_details(ui: &mut Ui, state: &AppState) {
    let Some(report) = state.selected_report() else {
        return;
    };
    match &report.outcome {
        GraphOutcome::Computed(graph) => {
            ui.strong("Filters");
            let active: Vec<_> = graph.spec.filters.iter().filter(|f| f.is_active()).collect();
            if active.is_empty() {
                ui.label("none");
            }
            for filter in active {
                ui.label(filter.to_string());
            }
            for column in &graph.skipped_filters {
                ui.label(
                    RichText::new(format!("'{column}' not in dataset, filter ignored"))
                        .color(SKIPPED_COLOR),
                );
            }
            ui.label(format!(
                "{} thresholds defined of {}",
                graph.result.defined_points(),
                graph.result.points.len()
            ));
        }
        GraphOutcome::Skipped(reason) => {
            ui.label(RichText::new(reason).color(SKIPPED_COLOR));
        }
        GraphOutcome::Failed(reason) => {
            ui.label(RichText::new(reason).color(Color32::RED));
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open parameters…").clicked() {
                open_params_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.params_path.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        if let Some(path) = &state.params_path {
            let summary = state.summary();
            ui.label(format!(
                "{}: {} computed, {} skipped, {} failed",
                path.display(),
                summary.computed,
                summary.skipped,
                summary.failed
            ));
            ui.separator();
        }

        ui.label(
            RichText::new(format!(
                "seed {} · {} resamples",
                state.config.seed, state.config.bootstrap.resamples
            ))
            .weak(),
        );

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_params_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open graph parameters")
        .add_filter("Supported files", &["csv", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening parameter file {}", path.display());
        state.load_params(&path);
    }
}

use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TlViewerApp {
    pub state: AppState,
    /// Title last sent to the window.
    title: String,
}

impl TlViewerApp {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            title: String::new(),
        }
    }
}

impl eframe::App for TlViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Ctrl+R recomputes the current parameter file.
        if ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::R)) {
            self.state.reload();
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: graph list ----
        egui::SidePanel::left("graph_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: TL plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::tl_plot(ui, &self.state);
        });

        let title = self.state.window_title();
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }
}

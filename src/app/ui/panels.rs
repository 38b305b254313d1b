use std::path::Path;

use eframe::egui::{self, Align, Color32, Context, Layout, RichText};
use tracing::{info, warn};

use crate::graph::RelationshipSpec;
use crate::interaction::{InteractionController, ModeLatch};
use crate::records::RecordSet;
use crate::scene::Scene;
use crate::settings::Settings;

use super::super::{StartupOptions, StatusLine, ViewModel};

const INITIAL_CANVAS: (u32, u32) = (1024, 768);

impl ViewModel {
    pub(in crate::app) const INITIAL_RECORD_ROWS: usize = 40;
    pub(in crate::app) const RECORD_PAGE_ROWS: usize = 40;
    pub(in crate::app) const RECORD_PREFETCH_MARGIN: usize = 4;

    pub(in crate::app) fn new(records: RecordSet, settings: Settings, startup: &StartupOptions) -> Self {
        let scene = Scene::new(records, &settings, INITIAL_CANVAS.0, INITIAL_CANVAS.1);
        let draft_field = scene.records().fields().into_iter().next().unwrap_or_default();

        let mut model = Self {
            scene,
            controller: InteractionController::default(),
            settings,
            draft: RelationshipSpec::new(draft_field.clone(), draft_field),
            search: String::new(),
            search_cache: None,
            view_config_text: String::new(),
            layout_path: startup
                .layout_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "layout.txt".to_owned()),
            previews: Vec::new(),
            status: None,
            scroll_accumulator: 0.0,
            last_render_ms: None,
            record_rows_visible: Self::INITIAL_RECORD_ROWS,
        };

        if let Some(raw) = &startup.view_config
            && let Err(error) = model.scene.apply_view_config(raw)
        {
            model.set_status(format!("Startup view configuration rejected: {error}"), true);
        }

        if let Some(path) = &startup.layout_path {
            match model.scene.load_layout(path) {
                Ok(applied) => info!(applied, path = %path.display(), "startup layout applied"),
                Err(error) => {
                    warn!(error = %format!("{error:#}"), "startup layout failed");
                    model.set_status(format!("Layout load failed: {error:#}"), true);
                }
            }
        }

        model.scene.zoom_to_fit();
        model.view_config_text = model.scene.view_config().serialize();
        model
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        records_path: &Path,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("linkview");
                    ui.separator();
                    ui.label(format!("records: {}", records_path.display()));
                    ui.label(format!("bundles: {}", self.scene.records().len()));
                    ui.label(format!("entities: {}", self.scene.links().graph().node_count()));
                    ui.label(format!(
                        "relationships: {}",
                        self.scene.links().relationships().len()
                    ));
                    let reload_button =
                        ui.add_enabled(!is_reloading, egui::Button::new("Reload records"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if is_reloading {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(context) = self.scene.context() {
                            ui.label(format!(
                                "rendered: {} nodes / {} links",
                                context.nodes().len(),
                                context.links().len()
                            ));
                        }
                    });
                });
            });

        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    match &self.status {
                        Some(status) if status.is_error => {
                            ui.label(RichText::new(status.text.as_str()).color(Color32::from_rgb(235, 110, 100)));
                        }
                        Some(status) => {
                            ui.label(status.text.as_str());
                        }
                        None => {
                            ui.label("Drag to select, right-drag to pan, hold G/L/C to arrange.");
                        }
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("gesture: {:?}", self.controller.state()));
                        let latched = [
                            (ModeLatch::Pan, "pan"),
                            (ModeLatch::Grid, "grid"),
                            (ModeLatch::Line, "line"),
                            (ModeLatch::Circle, "circle"),
                        ]
                        .into_iter()
                        .filter(|(latch, _)| self.controller.latched(*latch))
                        .map(|(_, name)| name)
                        .collect::<Vec<_>>();
                        if !latched.is_empty() {
                            ui.label(format!("held: {}", latched.join("+")));
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    pub(in crate::app) fn set_status(&mut self, text: String, is_error: bool) {
        self.status = Some(StatusLine { text, is_error });
    }

    pub(in crate::app) fn replace_records(&mut self, records: RecordSet) {
        info!(bundles = records.len(), "records reloaded");
        self.scene.replace_records(records);
        self.graph_changed();
        self.set_status("Records reloaded.".to_owned(), false);
    }

    /// Drops everything derived from the previous graph shape.
    pub(in crate::app) fn graph_changed(&mut self) {
        self.search_cache = None;
        self.previews.clear();
        self.record_rows_visible = Self::INITIAL_RECORD_ROWS;
        self.view_config_text = self.scene.view_config().serialize();
    }
}

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{info, warn};

use crate::graph::RelationshipSpec;
use crate::interaction::InteractionController;
use crate::layout::LayoutPreview;
use crate::records::{RecordSet, load_record_file};
use crate::scene::Scene;
use crate::settings::Settings;

mod graph;
mod render_utils;
mod ui;

type LoadResult = Result<RecordSet, String>;

/// What the command line asked for before the first records arrive.
#[derive(Clone, Debug)]
pub struct StartupOptions {
    pub records_path: PathBuf,
    pub layout_path: Option<PathBuf>,
    pub view_config: Option<String>,
}

pub struct LinkViewApp {
    startup: StartupOptions,
    settings: Settings,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    scene: Scene,
    controller: InteractionController,
    settings: Settings,
    draft: RelationshipSpec,
    search: String,
    search_cache: Option<SearchMatchCache>,
    view_config_text: String,
    layout_path: String,
    previews: Vec<LayoutPreview>,
    status: Option<StatusLine>,
    scroll_accumulator: f32,
    last_render_ms: Option<f64>,
    record_rows_visible: usize,
}

struct SearchMatchCache {
    query: String,
    strict: bool,
    matches: Arc<BTreeSet<String>>,
}

struct StatusLine {
    text: String,
    is_error: bool,
}

impl LinkViewApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, startup: StartupOptions, settings: Settings) -> Self {
        let state = Self::start_load(startup.records_path.clone());
        Self {
            startup,
            settings,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_record_file(&path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(path: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(path),
        }
    }

    fn ready(records: RecordSet, settings: &Settings, startup: &StartupOptions) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(records, settings.clone(), startup)))
    }
}

impl eframe::App for LinkViewApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(records) => Self::ready(records, &self.settings, &self.startup),
                        Err(error) => {
                            warn!(%error, "record load failed");
                            AppState::Error(error)
                        }
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading records...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load records");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.startup.records_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.startup.records_path, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    info!(path = %self.startup.records_path.display(), "reloading records");
                    self.reload_rx = Some(Self::spawn_load(self.startup.records_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(records)) => model.replace_records(records),
                        Ok(Err(error)) => {
                            warn!(%error, "record reload failed");
                            model.set_status(format!("Reload failed: {error}"), true);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

mod app;
mod codec;
mod graph;
mod interaction;
mod layout;
mod records;
mod scene;
mod settings;
mod util;
mod view;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::StartupOptions;
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON record file to visualize.
    #[arg(long)]
    records: PathBuf,

    /// Layout file applied after the first graph build.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// View configuration string applied at startup.
    #[arg(long)]
    view: Option<String>,

    #[arg(long)]
    verbose: bool,
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let startup = StartupOptions {
        records_path: args.records,
        layout_path: args.layout,
        view_config: args.view,
    };
    let settings = Settings::default();

    eframe::run_native(
        "linkview",
        options,
        Box::new(move |cc| Ok(Box::new(app::LinkViewApp::new(cc, startup, settings)))),
    )
}

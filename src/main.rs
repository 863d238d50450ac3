use std::path::PathBuf;

use clap::{Arg, Command};
use eframe::egui;
use log::{info, warn};

use mind_loom::editor::Editor;
use mind_loom::gui::frontend::{MindLoomApp, Startup};
use mind_loom::gui::scene::CanvasScene;
use mind_loom::persistence::persist;
use mind_loom::persistence::settings::AppSettings;

fn main() -> eframe::Result {
    env_logger::init();

    let matches = Command::new("Mind-Loom")
        .about("Interactive mindmap editor")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("state_dir").long("state-dir").value_name("DIR").help("Directory holding the saved document"))
        .arg(Arg::new("import").long("import").value_name("FILE").help("Open this exported document instead of the saved one"))
        .get_matches();

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        warn!("settings could not be read, using defaults: {}", e);
        AppSettings::default()
    });
    if let Some(dir) = matches.get_one::<String>("state_dir") {
        settings.autosave_override = Some(PathBuf::from(dir));
    }
    persist::set_settings_override(settings);
    let settings = persist::effective_settings();
    info!("saving to {}", settings.autosave_dir().display());

    let startup = match matches.get_one::<String>("import") {
        Some(file) => Startup::File(PathBuf::from(file)),
        None => Startup::Slot,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 760.0])
            .with_min_inner_size([640.0, 400.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Mind-Loom",
        options,
        Box::new(move |_cc| {
            let editor = Editor::new(CanvasScene::new(), settings);
            Ok(Box::new(MindLoomApp::new(editor, startup)) as Box<dyn eframe::App>)
        }),
    )
}

mod app;
mod ui;

use std::path::PathBuf;

use app::RustyRatesApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Optional: a file to open on start-up.
    let preload = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Rates – Unemployment Dashboard",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            let mut app = RustyRatesApp::default();
            if let Some(path) = &preload {
                ui::panels::load_path(&mut app.state, path);
            }
            Ok(Box::new(app))
        }),
    )
}

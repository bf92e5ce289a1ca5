use std::process::ExitCode;

use clap::Parser;
use eframe::egui;

use masktag::app::MaskTagApp;
use masktag::cli::{self, CliArgs};
use masktag::logger;

fn main() -> ExitCode {
    // -- CLI / headless mode -------------------------------------------
    if CliArgs::is_cli_mode() {
        let args = CliArgs::parse();
        return cli::run(args);
    }

    // -- GUI mode ------------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("MaskTag"),
        ..Default::default()
    };

    match eframe::run_native(
        "MaskTag",
        options,
        Box::new(|cc| Box::new(MaskTagApp::new(cc))),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("masktag: {}", e);
            ExitCode::FAILURE
        }
    }
}

mod audio;
mod cli;
mod config;
mod controls;
mod error;
mod fft;
mod gui;
mod session;
mod visualizer;

use audio::{CpalDestination, CpalMediaDevices, Destination, NullDestination};
use clap::Parser;
use gui::EqualizerApp;
use session::Session;
use visualizer::RenderLoop;

/// Sample rate assumed when there is no output device to ask.
const FALLBACK_SAMPLE_RATE: u32 = 44100;

fn main() -> Result<(), eframe::Error> {
    //
    // Initialize logging with default filter set to "info".
    //
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();
    log::info!("Starting eqscope with the {:?} preset...", args.preset);

    if args.list_devices {
        cli::log_output_devices();
    }

    //
    // Resolve and check the equalizer configuration.
    //
    let config = args.preset.config();
    if let Err(err) = config.validate() {
        log::error!("Invalid configuration: {}", err);
        std::process::exit(2);
    }

    //
    // Open the output device; without one the window still runs, silently.
    //
    let destination: Box<dyn Destination> = match CpalDestination::open_default() {
        Ok(dest) => Box::new(dest),
        Err(err) => {
            log::error!("{}; continuing without audio output", err);
            Box::new(NullDestination::new(FALLBACK_SAMPLE_RATE))
        }
    };

    //
    // Build graph and controls, then request the microphone.
    //
    let mut session = match Session::new(config, destination) {
        Ok(session) => session,
        Err(err) => {
            log::error!("Failed to build signal graph: {}", err);
            std::process::exit(2);
        }
    };
    // Failures are logged and shown in the window; the visualizer runs regardless.
    let _ = session.start(&mut CpalMediaDevices::new());

    log::info!("Initializing GUI...");
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([480.0, 420.0])
            .with_title("eqscope"),
        ..Default::default()
    };

    eframe::run_native(
        "eqscope",
        options,
        Box::new(move |cc| {
            gui::theme::setup_global_style(&cc.egui_ctx);
            Ok(Box::new(EqualizerApp::new(cc, session, RenderLoop::new())))
        }),
    )
}

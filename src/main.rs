mod app;
mod audio;
mod commands;
mod config;
mod logging;
mod waveform;

use std::process;

fn main() {
    if let Err(e) = app::run() {
        tracing::debug!("Exiting with error: {e:?}");
        eprintln!("Error: {e:#}");
        process::exit(app::exit_code(&e));
    }
}

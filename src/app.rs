//! Application orchestration.
//!
//! Parses the command line, sets up logging and hands a validated
//! [`RenderOptions`](crate::config::RenderOptions) to the render command.

use crate::audio::AudioError;
use crate::commands;
use crate::config::{self, Settings};
use crate::logging;
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Render waveform images from audio files
#[derive(Parser, Debug)]
#[command(name = "wav2png")]
#[command(version)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(
    long_about = "Render waveform images from audio files.\n\nFormats the built-in decoder cannot read are converted with ffmpeg when it is installed.\n\nEXAMPLES:\n    $ wav2png song.wav\n    $ wav2png -w 800 -h 120 -o preview.png song.flac\n    $ wav2png -d --db-min -60 -l podcast.mp3"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:    ./wav2png.toml or <config dir>/wav2png/wav2png.toml\n    Log level:      RUST_LOG (e.g. RUST_LOG=debug)"
)]
struct Cli {
    /// Audio file to render
    #[arg(value_name = "INPUT_FILE", required_unless_present = "completions")]
    input: Option<PathBuf>,

    /// Image width in pixels [default: 1800]
    #[arg(short, long)]
    width: Option<u32>,

    /// Image height in pixels [default: 280]
    #[arg(short, long)]
    height: Option<u32>,

    /// Background color as RRGGBBAA [default: efefefff]
    #[arg(short, long, value_name = "RRGGBBAA")]
    background_color: Option<String>,

    /// Foreground color as RRGGBBAA [default: 00000000]
    #[arg(short, long, value_name = "RRGGBBAA")]
    foreground_color: Option<String>,

    /// Output image path [default: <INPUT_FILE>.png]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file to read settings from
    #[arg(short = 'c', long, value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Use a logarithmic (dB) amplitude scale
    #[arg(short = 'd', long)]
    db_scale: bool,

    /// Lowest level shown on the dB scale [default: -48]
    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    db_min: Option<f32>,

    /// Highest level shown on the dB scale [default: 0]
    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    db_max: Option<f32>,

    /// Draw a line through the column medians instead of filled bands
    #[arg(short = 'l', long)]
    line_only: bool,

    /// Also write log messages to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    /// Settings given on the command line. Flags that were not passed stay
    /// unset so the config file can supply them.
    fn settings(&self) -> Settings {
        Settings {
            width: self.width,
            height: self.height,
            background_color: self.background_color.clone(),
            foreground_color: self.foreground_color.clone(),
            db_scale: self.db_scale.then_some(true),
            db_min: self.db_min,
            db_max: self.db_max,
            line_only: self.line_only.then_some(true),
        }
    }
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If the configuration is invalid
/// - If the input cannot be decoded or the image cannot be written
pub fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "wav2png", &mut io::stdout());
        return Ok(());
    }

    logging::init_logging(cli.log_file.as_deref())?;

    let settings = cli.settings();
    let input = cli
        .input
        .ok_or_else(|| anyhow::anyhow!("No input file given"))?;
    let options = config::resolve(input, cli.output, settings, cli.config_file.as_deref())?;

    commands::handle_render(&options)
}

/// Process exit code for a failed run.
///
/// # Exit Codes
/// - 1: General error (configuration, interruption, image output)
/// - 2: The input could not be opened or decoded
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if error.chain().any(|cause| cause.is::<AudioError>()) {
        2
    } else {
        1
    }
}

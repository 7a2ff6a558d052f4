//! Structured logging for wav2png using the tracing crate.
//!
//! Messages go to stderr so they never mix with anything written to stdout.
//! An additional log file can be requested; it is written through a
//! non-blocking appender that lives for the rest of the program.

use anyhow::anyhow;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Keeps the file appender's worker alive for the program lifetime.
static APPENDER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Default filter when `RUST_LOG` is not set: our own notices, everyone
/// else's warnings.
const DEFAULT_FILTER: &str = "wav2png=info,warn";

/// Initializes logging.
///
/// Log level is controlled by the RUST_LOG environment variable.
///
/// # Errors
/// - If the log file's directory cannot be created
/// - If logging was already initialized
pub fn init_logging(log_file: Option<&Path>) -> Result<(), anyhow::Error> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .with_level(true);

    let file_layer = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(rolling::never(dir, name));
            APPENDER_GUARD
                .set(guard)
                .map_err(|_| anyhow!("Logging already initialized"))?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    if let Some(path) = log_file {
        tracing::debug!("Logging initialized. Log file: {}", path.display());
    }
    Ok(())
}

//! Error types for opening and decoding audio.

use std::path::PathBuf;

/// Failures that end a run before any rendering happens.
///
/// Every variant is fatal. Non-fatal resource problems (ffmpeg exiting with a
/// non-zero status, a FIFO that could not be removed) are logged instead.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// The input file could not be opened at all.
    #[error("Failed to open audio file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The native decoder does not understand the container or codec.
    #[error("Unsupported audio format in '{}': {message}", path.display())]
    UnsupportedFormat { path: PathBuf, message: String },

    /// The native decoder recognised the file but could not read it.
    #[error("Failed to decode '{}': {message}", path.display())]
    CorruptFile { path: PathBuf, message: String },

    /// ffmpeg is missing or the process could not be started.
    #[error("Failed to start ffmpeg conversion for '{}': {message} (fallback decoder unavailable)", path.display())]
    DecoderSpawn { path: PathBuf, message: String },

    /// ffmpeg ran but its output could not be read back.
    #[error("Failed to open converted audio for '{}': {message}", path.display())]
    DecoderStream { path: PathBuf, message: String },
}

impl AudioError {
    pub(crate) fn spawn(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DecoderSpawn {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn stream(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DecoderStream {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from the native decoder rejecting the data,
    /// as opposed to the file being unreachable.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::CorruptFile { .. }
        )
    }
}

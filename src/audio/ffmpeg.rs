//! Locating the ffmpeg binary used as the fallback decoder.
//!
//! The lookup runs at most once per process. Absence is reported once as a
//! notice and disables the fallback for the rest of the run.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[cfg(windows)]
const BINARY: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const BINARY: &str = "ffmpeg";

static FFMPEG: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Path of the ffmpeg binary, probed on first call and cached afterwards.
pub fn ffmpeg_path() -> Option<&'static Path> {
    FFMPEG
        .get_or_init(|| {
            let found = find_ffmpeg();
            match &found {
                Some(path) => tracing::debug!("Found ffmpeg at: {}", path.display()),
                None => tracing::info!("Note: ffmpeg not found. Extended format support disabled."),
            }
            found
        })
        .as_deref()
}

/// Whether the fallback decoder can be used in this process.
pub fn is_available() -> bool {
    ffmpeg_path().is_some()
}

/// Searches `PATH` first, then the usual install locations that a minimal
/// `PATH` (cron, launchd, IDE terminals) tends to miss.
fn find_ffmpeg() -> Option<PathBuf> {
    let on_path = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).map(|dir| dir.join(BINARY)).collect::<Vec<_>>())
        .unwrap_or_default();

    on_path
        .into_iter()
        .chain(well_known_locations())
        .find(|candidate| candidate.is_file())
}

fn well_known_locations() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/snap/bin/ffmpeg"),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    } else {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_is_memoised() {
        let first = ffmpeg_path();
        let second = ffmpeg_path();
        assert_eq!(first, second);
        if let (Some(a), Some(b)) = (first, second) {
            assert!(std::ptr::eq(a, b));
        }
    }

    #[test]
    fn test_found_path_is_a_file() {
        // Passes either way; ffmpeg is optional on CI
        match ffmpeg_path() {
            Some(path) => assert!(path.is_file()),
            None => println!("ffmpeg not found (expected on CI)"),
        }
    }
}

//! Extension-based guess of whether the built-in decoder can read a file.

use std::path::Path;

/// Extensions handled by the symphonia features this binary is built with.
const NATIVE_EXTENSIONS: &[&str] = &[
    "wav", "wave", "aiff", "aif", "aifc", "caf", "flac", "ogg", "oga",
];

/// Returns `true` when the native decoder is expected to handle `path`.
///
/// A file without an extension also returns `true`: nothing is known about it,
/// so the native decoder gets the first and only attempt.
pub fn is_natively_supported(path: &Path) -> bool {
    match extension(path) {
        None => true,
        Some(ext) => NATIVE_EXTENSIONS.contains(&ext.as_str()),
    }
}

/// Lowercased extension, or `None` when the file name has no dot.
fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

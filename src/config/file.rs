//! Configuration file handling for wav2png.
//!
//! Settings come from a TOML file and from the command line. Every field is
//! optional so the two can be layered: command line over file over defaults.

use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Name looked up in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "wav2png.toml";

/// Rendering settings, as written in the config file.
///
/// ```toml
/// width = 1800
/// height = 280
/// background-color = "efefefff"
/// foreground-color = "00000000"
/// db-scale = true
/// db-min = -48.0
/// db-max = 0.0
/// line-only = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub background_color: Option<String>,
    pub foreground_color: Option<String>,
    pub db_scale: Option<bool>,
    pub db_min: Option<f32>,
    pub db_max: Option<f32>,
    pub line_only: Option<bool>,
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    /// - If the file cannot be read
    /// - If the TOML is malformed or has unknown keys
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            width: self.width.or(fallback.width),
            height: self.height.or(fallback.height),
            background_color: self.background_color.or(fallback.background_color),
            foreground_color: self.foreground_color.or(fallback.foreground_color),
            db_scale: self.db_scale.or(fallback.db_scale),
            db_min: self.db_min.or(fallback.db_min),
            db_max: self.db_max.or(fallback.db_max),
            line_only: self.line_only.or(fallback.line_only),
        }
    }
}

/// Loads the config file in effect.
///
/// An explicitly named file must exist. Otherwise `./wav2png.toml` and then
/// `<config dir>/wav2png/wav2png.toml` are tried; finding neither is fine.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(anyhow!("failed to read config file '{}'", path.display()));
        }
        tracing::debug!("Using config file {}", path.display());
        return Settings::load(path);
    }

    match default_locations().into_iter().find(|p| p.is_file()) {
        Some(path) => {
            tracing::debug!("Using config file {}", path.display());
            Settings::load(&path)
        }
        None => {
            tracing::debug!("No config file found, using defaults");
            Ok(Settings::default())
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("wav2png").join(CONFIG_FILE_NAME));
    }
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kebab_case_keys() {
        let settings = Settings::from_toml(
            r#"
            width = 640
            background-color = "ffffffff"
            db-scale = true
            db-min = -60.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.width, Some(640));
        assert_eq!(settings.background_color.as_deref(), Some("ffffffff"));
        assert_eq!(settings.db_scale, Some(true));
        assert_eq!(settings.db_min, Some(-60.0));
        assert_eq!(settings.height, None);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Settings::from_toml("colour = \"red\"").is_err());
    }

    #[test]
    fn test_command_line_wins_over_file() {
        let cli = Settings {
            width: Some(100),
            line_only: Some(true),
            ..Default::default()
        };
        let file = Settings {
            width: Some(640),
            height: Some(90),
            ..Default::default()
        };

        let merged = cli.or(file);
        assert_eq!(merged.width, Some(100));
        assert_eq!(merged.height, Some(90));
        assert_eq!(merged.line_only, Some(true));
        assert_eq!(merged.db_scale, None);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load_settings(Some(Path::new("/nonexistent/wav2png/custom.toml"))).is_err());
    }
}

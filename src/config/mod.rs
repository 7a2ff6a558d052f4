//! Configuration management for wav2png.
//!
//! Merges command-line settings with the config file, fills in defaults and
//! validates the result into the immutable [`RenderConfig`] the renderer uses.

pub mod color;
pub mod file;

pub use color::parse_color;
pub use file::{load_settings, Settings};

use crate::waveform::{AmplitudeScale, RenderConfig};
use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};

pub const DEFAULT_WIDTH: u32 = 1800;
pub const DEFAULT_HEIGHT: u32 = 280;
pub const DEFAULT_BACKGROUND: &str = "efefefff";
pub const DEFAULT_FOREGROUND: &str = "00000000";
pub const DEFAULT_DB_MIN: f32 = -48.0;
pub const DEFAULT_DB_MAX: f32 = 0.0;

/// A fully validated run: what to read, where to write, how to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub render: RenderConfig,
}

/// Builds the options for one run.
///
/// # Errors
/// - If the config file cannot be loaded
/// - If a dimension is zero, a color is malformed or the dB range is empty
pub fn resolve(
    input: PathBuf,
    output: Option<PathBuf>,
    cli: Settings,
    config_file: Option<&Path>,
) -> anyhow::Result<RenderOptions> {
    let settings = cli.or(load_settings(config_file)?);
    let render = settings.into_render_config()?;
    let output = output.unwrap_or_else(|| default_output(&input));

    Ok(RenderOptions {
        input,
        output,
        render,
    })
}

/// `<input>.png`, keeping the original extension.
fn default_output(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".png");
    PathBuf::from(name)
}

impl Settings {
    /// Applies defaults and validates.
    pub fn into_render_config(self) -> anyhow::Result<RenderConfig> {
        let width = self.width.unwrap_or(DEFAULT_WIDTH);
        let height = self.height.unwrap_or(DEFAULT_HEIGHT);
        if width == 0 {
            return Err(anyhow!("width cannot be 0."));
        }
        if height == 0 {
            return Err(anyhow!("height cannot be 0."));
        }

        let background = parse_color(self.background_color.as_deref().unwrap_or(DEFAULT_BACKGROUND))
            .context("invalid background color")?;
        let foreground = parse_color(self.foreground_color.as_deref().unwrap_or(DEFAULT_FOREGROUND))
            .context("invalid foreground color")?;

        let scale = if self.db_scale.unwrap_or(false) {
            let floor = self.db_min.unwrap_or(DEFAULT_DB_MIN);
            let ceiling = self.db_max.unwrap_or(DEFAULT_DB_MAX);
            if floor.is_nan() || ceiling.is_nan() || floor >= ceiling {
                return Err(anyhow!(
                    "db-min ({floor}) must be lower than db-max ({ceiling})"
                ));
            }
            AmplitudeScale::Decibel { floor, ceiling }
        } else {
            AmplitudeScale::Linear
        };

        Ok(RenderConfig {
            width,
            height,
            background,
            foreground,
            scale,
            line_only: self.line_only.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_defaults() {
        let config = Settings::default().into_render_config().unwrap();
        assert_eq!(config.width, 1800);
        assert_eq!(config.height, 280);
        assert_eq!(config.background, Rgba([0xef, 0xef, 0xef, 0xff]));
        assert_eq!(config.foreground, Rgba([0, 0, 0, 0]));
        assert_eq!(config.scale, AmplitudeScale::Linear);
        assert!(!config.line_only);
    }

    #[test]
    fn test_db_scale_uses_range() {
        let settings = Settings {
            db_scale: Some(true),
            db_min: Some(-60.0),
            ..Default::default()
        };
        let config = settings.into_render_config().unwrap();
        assert_eq!(
            config.scale,
            AmplitudeScale::Decibel { floor: -60.0, ceiling: 0.0 }
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_width = Settings { width: Some(0), ..Default::default() };
        assert!(zero_width.into_render_config().is_err());

        let zero_height = Settings { height: Some(0), ..Default::default() };
        assert!(zero_height.into_render_config().is_err());

        let bad_color = Settings {
            foreground_color: Some("black".to_string()),
            ..Default::default()
        };
        assert!(bad_color.into_render_config().is_err());

        let empty_range = Settings {
            db_scale: Some(true),
            db_min: Some(0.0),
            db_max: Some(0.0),
            ..Default::default()
        };
        assert!(empty_range.into_render_config().is_err());
    }

    #[test]
    fn test_db_range_ignored_for_linear_scale() {
        let settings = Settings {
            db_min: Some(10.0),
            db_max: Some(-10.0),
            ..Default::default()
        };
        assert!(settings.into_render_config().is_ok());
    }

    #[test]
    fn test_default_output_appends_png() {
        assert_eq!(
            default_output(Path::new("/music/song.mp3")),
            PathBuf::from("/music/song.mp3.png")
        );
    }
}

//! Waveform rendering.
//!
//! Each canvas column summarises a contiguous run of frames as min, max and
//! median, mapped to rows on a linear or decibel scale and painted either as
//! a filled band or as a line through the medians.

pub mod canvas;
pub mod pipeline;
pub mod reducer;
pub mod scale;

pub use canvas::Canvas;
pub use pipeline::render_waveform;
pub use scale::{db2float, AmplitudeScale};

use image::Rgba;

/// Everything the renderer needs to know about the output image.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub background: Rgba<u8>,
    pub foreground: Rgba<u8>,
    pub scale: AmplitudeScale,
    /// Draw a line through the column medians instead of filled bands.
    pub line_only: bool,
}

/// How a render pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Completed,
    /// The progress callback asked to stop; the canvas is incomplete.
    Aborted,
}

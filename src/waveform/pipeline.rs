//! Render entry point: source → reducer → canvas.

use super::canvas::Canvas;
use super::reducer::WaveformReducer;
use super::{RenderConfig, RenderStatus};
use crate::audio::SampleSource;

/// Draws `source` into `canvas` according to `config`.
///
/// Sources with fewer frames than the canvas is wide are drawn at one frame
/// per column into a narrower canvas first, then stretched to full width.
/// The stretch is skipped when `progress` aborts the render.
pub fn render_waveform<S, P>(
    source: &mut S,
    canvas: &mut Canvas,
    config: &RenderConfig,
    progress: P,
) -> RenderStatus
where
    S: SampleSource + ?Sized,
    P: FnMut(u32) -> bool,
{
    let mut reducer = WaveformReducer::new(config);
    let frames = source.frames();

    if frames >= canvas.width() as u64 {
        return reducer.paint(source, canvas, progress);
    }

    let native_width = frames.max(1) as u32;
    tracing::debug!(
        "Only {} frames for {} columns; rendering at native width",
        frames,
        canvas.width()
    );

    let mut native = Canvas::new(native_width, canvas.height());
    let status = reducer.paint(source, &mut native, progress);
    if status == RenderStatus::Completed {
        canvas.upscale_columns_from(&native);
    }
    status
}

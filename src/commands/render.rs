//! Render an audio file to a waveform PNG.

use crate::audio::{self, SampleSource};
use crate::config::RenderOptions;
use crate::waveform::{db2float, render_waveform, AmplitudeScale, Canvas, RenderStatus};
use anyhow::{anyhow, Context};
use console::Term;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decodes the input, draws the waveform and writes the image.
///
/// Nothing is written if decoding fails or the render is interrupted.
///
/// # Errors
/// - `AudioError` if the input cannot be opened or decoded
/// - If the render is interrupted with Ctrl-C
/// - If the PNG cannot be written
pub fn handle_render(options: &RenderOptions) -> Result<(), anyhow::Error> {
    let config = &options.render;
    tracing::debug!("Rendering {} -> {}", options.input.display(), options.output.display());

    let mut source = audio::open_audio_file(&options.input)?;
    tracing::debug!(
        "Input: {} channels, {} frames",
        source.channels(),
        source.frames()
    );

    if let AmplitudeScale::Decibel { floor, ceiling } = config.scale {
        tracing::debug!(
            "dB window {floor}..{ceiling} dBFS covers amplitudes {:.5}..{:.5}",
            db2float(floor),
            db2float(ceiling)
        );
    }

    let interrupted = interrupt_flag();
    let mut progress = ProgressLine::new();
    let mut canvas = Canvas::new(config.width, config.height);

    let status = render_waveform(&mut source, &mut canvas, config, |percent| {
        progress.update(percent);
        !interrupted.load(Ordering::Relaxed)
    });
    progress.finish();

    if status == RenderStatus::Aborted {
        return Err(anyhow!("Rendering interrupted; no image written"));
    }

    canvas
        .save(&options.output)
        .with_context(|| format!("Failed to write image '{}'", options.output.display()))?;
    tracing::info!("Waveform written to {}", options.output.display());
    Ok(())
}

/// Flag raised by Ctrl-C. The render checks it at every progress step.
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        tracing::warn!("Could not install Ctrl-C handler: {e}");
    }
    flag
}

/// `converting: N%`, rewritten in place while stderr is a terminal.
struct ProgressLine {
    term: Term,
    enabled: bool,
    last: Option<u32>,
}

impl ProgressLine {
    fn new() -> Self {
        let term = Term::stderr();
        let enabled = term.is_term();
        Self {
            term,
            enabled,
            last: None,
        }
    }

    fn update(&mut self, percent: u32) {
        if !self.enabled || self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format!("converting: {percent}%"));
    }

    fn finish(&mut self) {
        if self.enabled && self.last.is_some() {
            let _ = self.term.write_line("");
        }
    }
}

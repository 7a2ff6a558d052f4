//! Command handlers for wav2png.
//!
//! # Commands
//! - `render`: Decode an audio file and write its waveform as a PNG

pub mod render;

pub use render::handle_render;

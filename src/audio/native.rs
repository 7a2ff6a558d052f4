//! Native decoding through symphonia.
//!
//! Files with a known frame count are decoded packet by packet while the
//! waveform is drawn. Files whose container does not state a length are
//! decoded up front into a [`MemorySource`].

use super::{AudioError, MemorySource, SampleSource};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Streaming decoder for one audio track.
pub struct NativeSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    channels: usize,
    frames: u64,
    /// Decoded samples not yet handed out.
    pending: Vec<i16>,
    cursor: usize,
    convert: Option<SampleBuffer<i16>>,
    finished: bool,
}

impl NativeSource {
    /// Opens `path` with the native decoder.
    ///
    /// # Errors
    /// - `Open` if the file cannot be opened
    /// - `UnsupportedFormat` if no reader or codec matches the data
    /// - `CorruptFile` if the data is recognised but unreadable
    pub fn open(path: &Path) -> Result<Box<dyn SampleSource>, AudioError> {
        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| classify(path, e))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::UnsupportedFormat {
                path: path.to_path_buf(),
                message: "no decodable audio track".to_string(),
            })?;

        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .filter(|&c| c > 0)
            .ok_or_else(|| AudioError::CorruptFile {
                path: path.to_path_buf(),
                message: "channel layout is not declared".to_string(),
            })?;
        let frames = track.codec_params.n_frames;
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| classify(path, e))?;

        tracing::debug!(
            "Native decoder opened {}: {} channels, {} frames",
            path.display(),
            channels,
            frames.map_or_else(|| "unknown".to_string(), |f| f.to_string())
        );

        let mut source = NativeSource {
            format,
            decoder,
            track_id,
            channels,
            frames: frames.unwrap_or(0),
            pending: Vec::new(),
            cursor: 0,
            convert: None,
            finished: false,
        };

        match frames {
            Some(_) => Ok(Box::new(source)),
            None => Ok(Box::new(source.drain())),
        }
    }

    /// Decodes everything that is left into memory.
    fn drain(&mut self) -> MemorySource {
        let mut samples = Vec::new();
        while self.decode_next() {
            samples.extend_from_slice(&self.pending[self.cursor..]);
            self.cursor = self.pending.len();
        }
        tracing::debug!(
            "Decoded {} frames from a stream without a declared length",
            samples.len() / self.channels
        );
        MemorySource::new(samples, self.channels)
    }

    /// Refills `pending` with the next decoded packet. Returns `false` at end
    /// of stream; decode errors after the header end the stream early.
    fn decode_next(&mut self) -> bool {
        while !self.finished {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Stopping decode early: {e}");
                    self.finished = true;
                    break;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping undecodable packet: {e}");
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Stopping decode early: {e}");
                    self.finished = true;
                    break;
                }
            };

            let spec = *decoded.spec();
            let frames = decoded.capacity();
            let fits = self
                .convert
                .as_ref()
                .is_some_and(|buf| buf.capacity() >= frames * spec.channels.count());
            if !fits {
                self.convert = Some(SampleBuffer::<i16>::new(frames as u64, spec));
            }

            self.pending.clear();
            if let Some(convert) = self.convert.as_mut() {
                convert.copy_interleaved_ref(decoded);
                self.pending.extend_from_slice(convert.samples());
            }
            self.cursor = 0;
            if !self.pending.is_empty() {
                return true;
            }
        }
        false
    }
}

impl SampleSource for NativeSource {
    fn channels(&self) -> usize {
        self.channels
    }

    fn frames(&self) -> u64 {
        self.frames
    }

    fn read_frames(&mut self, buf: &mut [i16], frames: usize) -> usize {
        let wanted = (frames * self.channels).min(buf.len());
        let mut filled = 0;

        while filled < wanted {
            if self.cursor == self.pending.len() && !self.decode_next() {
                break;
            }
            let count = (wanted - filled).min(self.pending.len() - self.cursor);
            buf[filled..filled + count]
                .copy_from_slice(&self.pending[self.cursor..self.cursor + count]);
            self.cursor += count;
            filled += count;
        }

        filled / self.channels
    }
}

/// Splits symphonia failures into "not my format" and "broken file".
fn classify(path: &Path, err: SymphoniaError) -> AudioError {
    match err {
        SymphoniaError::Unsupported(message) => AudioError::UnsupportedFormat {
            path: path.to_path_buf(),
            message: message.to_string(),
        },
        other => AudioError::CorruptFile {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

//! Fully decoded, in-memory sample source.

use super::SampleSource;

/// Interleaved 16-bit samples held in memory.
///
/// Used for streams whose length is only known after reading them to the end
/// (the ffmpeg pipe, native formats without a frame count).
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<i16>,
    channels: usize,
    position: usize,
}

impl MemorySource {
    /// Wraps interleaved samples. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<i16>, channels: usize) -> Self {
        let channels = channels.max(1);
        samples.truncate(samples.len() - samples.len() % channels);
        Self {
            samples,
            channels,
            position: 0,
        }
    }
}

impl SampleSource for MemorySource {
    fn channels(&self) -> usize {
        self.channels
    }

    fn frames(&self) -> u64 {
        (self.samples.len() / self.channels) as u64
    }

    fn read_frames(&mut self, buf: &mut [i16], frames: usize) -> usize {
        let wanted = (frames * self.channels).min(buf.len());
        let available = self.samples.len() - self.position;
        let count = wanted.min(available) / self.channels * self.channels;

        buf[..count].copy_from_slice(&self.samples[self.position..self.position + count]);
        self.position += count;
        count / self.channels
    }
}

//! Audio input for wav2png.
//!
//! Files are opened with the native decoder first. When it fails on a format
//! it is not expected to read, and ffmpeg is installed, the file is decoded
//! through ffmpeg instead.

pub mod error;
pub mod ffmpeg;
pub mod memory;
pub mod native;
pub mod probe;
pub mod transcoder;

pub use error::AudioError;
pub use memory::MemorySource;
pub use native::NativeSource;
pub use probe::is_natively_supported;
pub use transcoder::open_via_external_decoder;

use std::path::Path;

/// Largest sample magnitude of the 16-bit working format.
pub const FULL_SCALE: f32 = 32768.0;

/// Interleaved 16-bit frames from some decoder.
pub trait SampleSource {
    /// Channels per frame, at least 1.
    fn channels(&self) -> usize;

    /// Total frames the source expects to deliver.
    fn frames(&self) -> u64;

    /// Reads up to `frames` frames into `buf`, returning the number of whole
    /// frames written. Returns 0 at end of stream; decode problems after the
    /// stream was opened end it early rather than failing the read.
    fn read_frames(&mut self, buf: &mut [i16], frames: usize) -> usize;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn frames(&self) -> u64 {
        (**self).frames()
    }

    fn read_frames(&mut self, buf: &mut [i16], frames: usize) -> usize {
        (**self).read_frames(buf, frames)
    }
}

/// Opens `path` with the native decoder, falling back to ffmpeg.
///
/// # Errors
/// - The native decoder's error when the file is unreachable, its extension is
///   one the native decoder claims, or ffmpeg is not installed
/// - `DecoderSpawn` / `DecoderStream` from the ffmpeg path
pub fn open_audio_file(path: &Path) -> Result<Box<dyn SampleSource>, AudioError> {
    select_source(path, ffmpeg::is_available, open_via_external_decoder)
}

/// Native first; `convert` only runs when the native failure is a foreign
/// format and `fallback_available` says a converter exists.
fn select_source(
    path: &Path,
    fallback_available: impl FnOnce() -> bool,
    convert: impl FnOnce(&Path) -> Result<MemorySource, AudioError>,
) -> Result<Box<dyn SampleSource>, AudioError> {
    let native_err = match NativeSource::open(path) {
        Ok(source) => return Ok(source),
        Err(e) => e,
    };

    if !native_err.is_decode_failure() || is_natively_supported(path) || !fallback_available() {
        return Err(native_err);
    }

    tracing::debug!("Native decoder failed: {native_err}");
    tracing::info!("Attempting to convert {} using ffmpeg...", path.display());

    let source = convert(path)?;
    Ok(Box::new(source))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::transcoder::INTERMEDIATE_SAMPLE_RATE;
    use super::AudioError;
    use std::path::Path;

    /// Writes interleaved 16-bit samples as a WAV file.
    pub fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// WAV bytes the way ffmpeg writes them to a pipe: unknown sizes and a
    /// LIST chunk in front of the samples.
    pub fn streamed_wav(channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");

        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&INTERMEDIATE_SAMPLE_RATE.to_le_bytes());
        bytes.extend_from_slice(&(INTERMEDIATE_SAMPLE_RATE * 2 * channels as u32).to_le_bytes());
        bytes.extend_from_slice(&(2 * channels).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());

        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"INFO");

        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    /// Shell script standing in for ffmpeg. It records its arguments to
    /// `dir/args.txt`, writes `stream` into its last argument and exits with
    /// `exit_code`.
    #[cfg(unix)]
    pub fn stub_ffmpeg(dir: &Path, stream: &[u8], exit_code: i32) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let stream_path = dir.join("stream.wav");
        std::fs::write(&stream_path, stream).unwrap();

        let script = dir.join("ffmpeg");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nfor last; do :; done\ncat '{}' > \"$last\"\nexit {}\n",
                dir.join("args.txt").display(),
                stream_path.display(),
                exit_code
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    /// Retries while the process cannot be started. A freshly written script
    /// is briefly busy (ETXTBSY) if another test thread forks meanwhile.
    pub fn retry_spawn<T>(
        mut attempt: impl FnMut() -> Result<T, AudioError>,
    ) -> Result<T, AudioError> {
        for _ in 0..10 {
            match attempt() {
                Err(AudioError::DecoderSpawn { .. }) => {
                    std::thread::sleep(std::time::Duration::from_millis(50));
                }
                other => return other,
            }
        }
        attempt()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{streamed_wav, write_wav};
    use super::*;

    fn no_fallback() -> bool {
        panic!("fallback consulted for a file it must not handle")
    }

    fn no_convert(_: &Path) -> Result<MemorySource, AudioError> {
        panic!("converter started for a file it must not handle")
    }

    #[test]
    fn test_native_file_opens_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("direct.wav");
        write_wav(&path, 1, 8000, &[0, 100, -100, 0]);

        let source = select_source(&path, no_fallback, no_convert).unwrap();
        assert_eq!(source.channels(), 1);
        assert_eq!(source.frames(), 4);
    }

    #[test]
    fn test_broken_native_format_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.flac");
        std::fs::write(&path, b"fLaC but then nothing sensible at all").unwrap();

        let err = select_source(&path, no_fallback, no_convert).err().unwrap();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_missing_file_is_not_retried() {
        let err = select_source(Path::new("/nonexistent/wav2png/song.mp3"), no_fallback, no_convert)
            .err()
            .unwrap();
        assert!(matches!(err, AudioError::Open { .. }));
    }

    #[test]
    fn test_foreign_format_without_ffmpeg_keeps_native_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_really.mp3");
        std::fs::write(&path, b"this is no audio format anyone knows").unwrap();

        let err = select_source(&path, || false, no_convert).err().unwrap();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_converter_error_propagates_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_really.mp3");
        std::fs::write(&path, b"this is no audio format anyone knows").unwrap();

        let err = select_source(&path, || true, |p| Err(AudioError::stream(p, "bad header")))
            .err()
            .unwrap();
        assert!(matches!(err, AudioError::DecoderStream { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_foreign_format_is_converted_through_ffmpeg() {
        use super::test_support::{retry_spawn, stub_ffmpeg};

        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<i16> = (0..8820).map(|i| ((i % 200) * 100 - 10000) as i16).collect();
        let ffmpeg = stub_ffmpeg(dir.path(), &streamed_wav(2, &samples), 1);
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"ID3 tag and nothing the native decoder reads").unwrap();

        let mut source = retry_spawn(|| {
            select_source(&path, || true, |p| transcoder::transcode(&ffmpeg, p))
        })
        .unwrap();
        assert_eq!(source.channels(), 2);
        assert_eq!(source.frames(), 4410);

        let mut first = [0i16; 4];
        assert_eq!(source.read_frames(&mut first, 2), 2);
        assert_eq!(first, [-10000, -9900, -9800, -9700]);

        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(args.lines().nth(2), path.to_str());
    }
}

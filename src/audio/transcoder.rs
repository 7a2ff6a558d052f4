//! ffmpeg fallback decoder.
//!
//! ffmpeg transcodes the input to 16-bit PCM WAV and writes it into a freshly
//! created FIFO (unix) or its own stdout (elsewhere). The WAV stream is read
//! back here until end of stream, so the frame count is exact even though
//! ffmpeg cannot fill in the chunk sizes on a pipe.

use super::{ffmpeg, AudioError, MemorySource};
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Sample rate of the intermediate stream.
pub const INTERMEDIATE_SAMPLE_RATE: u32 = 44_100;

/// Largest non-data chunk accepted before the PCM payload (LIST/INFO and friends).
const MAX_HEADER_CHUNK: usize = 1 << 20;

/// Decodes `path` through the ffmpeg found on this system.
///
/// The whole converted stream is held in memory (two bytes per sample at
/// 44.1 kHz) so the frame count is exact before rendering starts.
///
/// # Errors
/// - `DecoderSpawn` if ffmpeg is missing or cannot be started
/// - `DecoderStream` if ffmpeg's output is not 16-bit PCM WAV
pub fn open_via_external_decoder(path: &Path) -> Result<MemorySource, AudioError> {
    let ffmpeg = ffmpeg::ffmpeg_path().ok_or_else(|| AudioError::spawn(path, "ffmpeg not found"))?;
    transcode(ffmpeg, path)
}

/// Runs the `ffmpeg` binary on `path` and collects the converted samples.
pub fn transcode(ffmpeg: &Path, path: &Path) -> Result<MemorySource, AudioError> {
    let mut transcoder = Transcoder::spawn(ffmpeg, path)?;
    let output = transcoder.open_output()?;
    let source = read_intermediate(path, output)?;

    // The stream hit EOF, so ffmpeg has closed its end and waiting cannot stall.
    transcoder.wait();
    Ok(source)
}

/// A running ffmpeg process and the conduit it writes into.
///
/// Dropping the handle removes the conduit's name but never waits for the
/// process; an abandoned ffmpeg exits on its own once its reader is gone.
pub struct Transcoder {
    input: PathBuf,
    child: Child,
    status: Option<ExitStatus>,
    reaped: bool,
    conduit: Conduit,
}

impl Transcoder {
    /// Starts ffmpeg converting `input` into a new conduit.
    pub fn spawn(ffmpeg: &Path, input: &Path) -> Result<Self, AudioError> {
        let conduit = Conduit::create()
            .map_err(|e| AudioError::spawn(input, format!("failed to create pipe: {e}")))?;

        let mut command = Command::new(ffmpeg);
        command
            .arg("-nostdin")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .args(["-f", "wav", "-acodec", "pcm_s16le"])
            .arg("-ar")
            .arg(INTERMEDIATE_SAMPLE_RATE.to_string())
            .arg("-y")
            .arg(conduit.target());

        Self::launch(command, input, conduit)
    }

    fn launch(mut command: Command, input: &Path, conduit: Conduit) -> Result<Self, AudioError> {
        command
            .stdin(Stdio::null())
            .stdout(conduit.child_stdout())
            .stderr(Stdio::null());

        let child = command
            .spawn()
            .map_err(|e| AudioError::spawn(input, e.to_string()))?;
        tracing::debug!("Transcoder started (pid {}) for {}", child.id(), input.display());

        Ok(Self {
            input: input.to_path_buf(),
            child,
            status: None,
            reaped: false,
            conduit,
        })
    }

    /// Waits for the process once and caches the result.
    ///
    /// Repeated calls return the cached status. A non-zero exit is logged as a
    /// warning only; whether the output was usable is decided by the reader.
    pub fn wait(&mut self) -> Option<ExitStatus> {
        if !self.reaped {
            self.reaped = true;
            match self.child.wait() {
                Ok(status) => self.record_exit(status),
                Err(e) => tracing::warn!("Failed to wait for ffmpeg: {e}"),
            }
        }
        self.status
    }

    fn record_exit(&mut self, status: ExitStatus) {
        self.reaped = true;
        if !status.success() {
            tracing::warn!("Warning: ffmpeg exited with {status}");
        }
        self.status = Some(status);
    }

    /// Non-blocking check whether the process has exited.
    #[cfg(unix)]
    fn has_exited(&mut self) -> bool {
        if self.reaped {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.record_exit(status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to poll ffmpeg: {e}");
                self.reaped = true;
                true
            }
        }
    }

    /// Opens the read side of the FIFO.
    ///
    /// `open(2)` on a FIFO blocks until a writer shows up, so it runs on a
    /// helper thread while this thread watches the process. If ffmpeg dies
    /// before connecting, the opener is released with an empty stream.
    #[cfg(unix)]
    pub fn open_output(&mut self) -> Result<Box<dyn Read>, AudioError> {
        use std::sync::mpsc::{self, RecvTimeoutError};
        use std::time::Duration;

        const POLL: Duration = Duration::from_millis(20);
        const RELEASE_ATTEMPTS: usize = 50;

        let path = self.conduit.path.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(std::fs::File::open(&path));
        });

        let opened = loop {
            match rx.recv_timeout(POLL) {
                Ok(result) => break result,
                Err(RecvTimeoutError::Timeout) => {
                    if !self.has_exited() {
                        continue;
                    }
                    tracing::debug!("ffmpeg exited before opening its output");
                    let mut released = None;
                    for _ in 0..RELEASE_ATTEMPTS {
                        self.conduit.connect_empty_writer();
                        match rx.recv_timeout(POLL) {
                            Ok(result) => {
                                released = Some(result);
                                break;
                            }
                            Err(RecvTimeoutError::Timeout) => continue,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    break released.unwrap_or_else(|| {
                        Err(io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            "ffmpeg exited before producing output",
                        ))
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break Err(io::Error::other("pipe opener thread vanished"));
                }
            }
        };

        // Open handles keep the data flowing; only the name goes away.
        self.conduit.release();

        let file = opened.map_err(|e| AudioError::stream(&self.input, e.to_string()))?;
        Ok(Box::new(file))
    }

    /// Takes ffmpeg's stdout, which is the conduit on this platform.
    #[cfg(not(unix))]
    pub fn open_output(&mut self) -> Result<Box<dyn Read>, AudioError> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as Box<dyn Read>)
            .ok_or_else(|| AudioError::stream(&self.input, "ffmpeg stdout is not captured"))
    }
}

impl Drop for Transcoder {
    fn drop(&mut self) {
        if !self.reaped {
            tracing::debug!("Leaving ffmpeg (pid {}) to finish on its own", self.child.id());
        }
    }
}

/// Uniquely named FIFO in the temp directory.
#[cfg(unix)]
struct Conduit {
    path: PathBuf,
    linked: bool,
}

#[cfg(unix)]
impl Conduit {
    fn create() -> io::Result<Self> {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        for _ in 0..16 {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos())
                .unwrap_or(0);
            let path = std::env::temp_dir().join(format!(
                "wav2png_{}_{}_{}",
                std::process::id(),
                nanos,
                COUNTER.fetch_add(1, Ordering::Relaxed)
            ));

            match mkfifo(&path) {
                Ok(()) => {
                    tracing::debug!("Created FIFO {}", path.display());
                    return Ok(Self { path, linked: true });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find an unused FIFO name",
        ))
    }

    fn target(&self) -> &std::ffi::OsStr {
        self.path.as_os_str()
    }

    fn child_stdout(&self) -> Stdio {
        Stdio::null()
    }

    /// Opens and immediately closes a writer so a blocked reader sees EOF.
    fn connect_empty_writer(&self) {
        use std::os::unix::fs::OpenOptionsExt;

        let _ = std::fs::OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path);
    }

    fn release(&mut self) {
        if !self.linked {
            return;
        }
        self.linked = false;
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove FIFO {}: {e}", self.path.display());
        }
    }
}

#[cfg(unix)]
impl Drop for Conduit {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn mkfifo(path: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Anonymous pipe on ffmpeg's stdout; nothing to name or remove.
#[cfg(not(unix))]
struct Conduit;

#[cfg(not(unix))]
impl Conduit {
    fn create() -> io::Result<Self> {
        Ok(Self)
    }

    fn target(&self) -> &std::ffi::OsStr {
        std::ffi::OsStr::new("pipe:1")
    }

    fn child_stdout(&self) -> Stdio {
        Stdio::piped()
    }
}

/// Parses a 16-bit PCM WAV stream of unknown length.
///
/// hound validates the header; the payload is then read to end of stream
/// regardless of the length the header claims.
pub fn read_intermediate(input: &Path, stream: impl Read) -> Result<MemorySource, AudioError> {
    let mut reader = BufReader::new(stream);

    let header = read_header(&mut reader).map_err(|e| AudioError::stream(input, e.to_string()))?;
    let spec = hound::WavReader::new(Cursor::new(header))
        .map_err(|e| AudioError::stream(input, e.to_string()))?
        .spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::stream(
            input,
            format!(
                "expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            ),
        ));
    }

    let samples = read_pcm16(&mut reader).map_err(|e| AudioError::stream(input, e.to_string()))?;
    let source = MemorySource::new(samples, spec.channels as usize);
    tracing::debug!(
        "Converted stream: {} channels at {}Hz",
        spec.channels,
        spec.sample_rate
    );
    Ok(source)
}

/// Copies the RIFF header up to and including the `data` chunk header, with
/// the size fields rewritten so the header describes an empty file.
fn read_header(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut header = vec![0u8; 12];
    reader.read_exact(&mut header)?;
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "stream is not RIFF/WAVE",
        ));
    }

    loop {
        let mut chunk = [0u8; 8];
        reader.read_exact(&mut chunk)?;
        header.extend_from_slice(&chunk);

        if &chunk[0..4] == b"data" {
            let at = header.len() - 4;
            header[at..].copy_from_slice(&0u32.to_le_bytes());
            break;
        }

        let len = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]) as usize;
        let padded = len + (len & 1);
        if padded > MAX_HEADER_CHUNK {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("oversized '{}' chunk before audio data", String::from_utf8_lossy(&chunk[0..4])),
            ));
        }
        let start = header.len();
        header.resize(start + padded, 0);
        reader.read_exact(&mut header[start..])?;
    }

    let riff_len = (header.len() - 8) as u32;
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());
    Ok(header)
}

/// Reads little-endian i16 samples until end of stream.
fn read_pcm16(reader: &mut impl Read) -> io::Result<Vec<i16>> {
    let mut samples = Vec::new();
    let mut chunk = vec![0u8; 64 * 1024];
    let mut carry: Option<u8> = None;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let mut bytes = &chunk[..n];
        if let Some(low) = carry.take() {
            samples.push(i16::from_le_bytes([low, bytes[0]]));
            bytes = &bytes[1..];
        }
        let pairs = bytes.chunks_exact(2);
        carry = pairs.remainder().first().copied();
        samples.extend(pairs.map(|p| i16::from_le_bytes([p[0], p[1]])));
    }

    Ok(samples)
}

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{AudioProvider, PcmBuffer, SourceState, StereoSample};

/// Default delay between two attempts to reopen the pipe.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

const BYTES_PER_FRAME: usize = 4;

// Caps how much a single tick drains when the writer runs ahead of us.
const MAX_FRAMES_PER_TICK: usize = 8;

/// Reads interleaved s16le stereo PCM from a named pipe, as written by an
/// MPD `fifo` output with format `44100:16:2`.
///
/// The pipe is opened non-blocking, so opening never waits for a writer and
/// `tick` only drains what is already buffered. A writer that goes away and
/// comes back is picked up on the same descriptor. Dropping the source
/// closes the pipe immediately.
pub struct PipeSource {
    path: PathBuf,
    sample_size: usize,
    file: Option<File>,
    pending: Vec<u8>,
    reconnect_interval: Duration,
    last_attempt: Option<Instant>,
}

impl PipeSource {
    pub fn new(path: PathBuf, sample_size: usize) -> Self {
        Self::with_reconnect_interval(path, sample_size, RECONNECT_INTERVAL)
    }

    /// Like [`new`](Self::new) but retries a failed open every `interval`
    /// instead of every [`RECONNECT_INTERVAL`].
    pub fn with_reconnect_interval(path: PathBuf, sample_size: usize, interval: Duration) -> Self {
        let mut source = Self {
            path,
            sample_size,
            file: None,
            pending: Vec::new(),
            reconnect_interval: interval,
            last_attempt: None,
        };
        source.try_open();
        source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the pipe is currently open.
    pub fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    fn try_open(&mut self) {
        self.last_attempt = Some(Instant::now());
        match open_nonblocking(&self.path) {
            Ok(file) => {
                tracing::debug!(path = ?self.path, "fifo opened");
                self.file = Some(file);
                self.pending.clear();
            }
            Err(err) => tracing::debug!(path = ?self.path, error = %err, "unable to open fifo"),
        }
    }

    fn frame_bytes(&self) -> usize {
        self.sample_size * BYTES_PER_FRAME
    }
}

fn open_nonblocking(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    #[cfg(unix)]
    options.custom_flags(libc::O_NONBLOCK);
    options.open(path)
}

fn decode_frames(raw: &[u8], out: &mut [StereoSample]) {
    for (chunk, sample) in raw.chunks_exact(BYTES_PER_FRAME).zip(out.iter_mut()) {
        sample.l = i16::from_le_bytes([chunk[0], chunk[1]]);
        sample.r = i16::from_le_bytes([chunk[2], chunk[3]]);
    }
}

impl AudioProvider for PipeSource {
    fn update(&mut self) {
        if self.file.is_some() {
            return;
        }

        let due = self
            .last_attempt
            .map(|at| at.elapsed() >= self.reconnect_interval)
            .unwrap_or(true);
        if due {
            self.try_open();
        }
    }

    fn tick(&mut self, _seconds: f32, buffer: &mut PcmBuffer) -> bool {
        let frame_bytes = self.frame_bytes();
        let Some(file) = self.file.as_mut() else {
            return false;
        };
        if frame_bytes == 0 {
            return false;
        }

        let budget = frame_bytes * MAX_FRAMES_PER_TICK;
        let mut chunk = [0u8; 4096];
        let mut drained = 0;
        let mut failed = false;
        while drained < budget {
            let want = chunk.len().min(budget - drained);
            match file.read(&mut chunk[..want]) {
                // No writer attached, or nothing written yet.
                Ok(0) => break,
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    drained += n;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!(path = ?self.path, error = %err, "fifo read failed");
                    failed = true;
                    break;
                }
            }
        }

        if failed {
            self.file = None;
            self.pending.clear();
            return false;
        }

        // Only the newest complete frame is kept.
        let complete = self.pending.len() / frame_bytes;
        if complete == 0 {
            return false;
        }
        let start = (complete - 1) * frame_bytes;
        decode_frames(
            &self.pending[start..start + frame_bytes],
            buffer.samples_mut(),
        );
        self.pending.drain(..complete * frame_bytes);
        true
    }

    fn kind(&self) -> SourceState {
        SourceState::PipeSource
    }
}

impl std::fmt::Debug for PipeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeSource")
            .field("path", &self.path)
            .field("sample_size", &self.sample_size)
            .field("connected", &self.is_connected())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::thread;

    use super::*;

    fn frame_bytes(frames: &[(i16, i16)]) -> Vec<u8> {
        frames
            .iter()
            .flat_map(|(l, r)| l.to_le_bytes().into_iter().chain(r.to_le_bytes()))
            .collect()
    }

    #[cfg(unix)]
    fn make_fifo(path: &Path) {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
        assert_eq!(rc, 0, "mkfifo failed: {}", io::Error::last_os_error());
    }

    #[cfg(unix)]
    fn open_writer(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
    }

    #[test]
    fn decodes_little_endian_pairs() {
        let raw = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0xff, 0x7f];
        let mut out = [StereoSample::default(); 2];
        decode_frames(&raw, &mut out);
        assert_eq!(out[0], StereoSample::new(1, -1));
        assert_eq!(out[1], StereoSample::new(i16::MIN, i16::MAX));
    }

    #[test]
    fn reads_a_frame_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&frame_bytes(&[(0, 0), (100, -100), (200, -200), (300, -300)]))
            .unwrap();
        file.flush().unwrap();

        let mut source = PipeSource::new(file.path().to_path_buf(), 4);
        let mut buffer = PcmBuffer::new(4);
        assert!(source.tick(0.016, &mut buffer));
        assert_eq!(buffer.samples()[3], StereoSample::new(300, -300));

        // The frame is only reported once.
        assert!(!source.tick(0.016, &mut buffer));
    }

    #[test]
    fn keeps_only_the_newest_complete_frame() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&frame_bytes(&[(1, 1), (2, 2), (3, 3)])).unwrap();
        file.write_all(&[0x09]).unwrap();
        file.flush().unwrap();

        let mut source = PipeSource::new(file.path().to_path_buf(), 1);
        let mut buffer = PcmBuffer::new(1);
        assert!(source.tick(0.016, &mut buffer));
        assert_eq!(buffer.samples()[0], StereoSample::new(3, 3));
        assert_eq!(source.pending.len(), 1);
    }

    #[test]
    fn missing_pipe_reports_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = PipeSource::new(dir.path().join("absent.fifo"), 16);
        let mut buffer = PcmBuffer::new(16);

        source.update();
        assert!(!source.tick(0.016, &mut buffer));
        assert!(!source.is_connected());
        assert_eq!(source.kind(), SourceState::PipeSource);
    }

    #[test]
    fn reopens_only_after_the_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.fifo");
        let mut source =
            PipeSource::with_reconnect_interval(path.clone(), 2, Duration::from_millis(200));
        let mut buffer = PcmBuffer::new(2);
        assert!(!source.is_connected());

        std::fs::write(&path, frame_bytes(&[(5, 6), (7, 8)])).unwrap();
        source.update();
        assert!(!source.is_connected());

        thread::sleep(Duration::from_millis(250));
        source.update();
        assert!(source.is_connected());
        assert!(source.tick(0.016, &mut buffer));
        assert_eq!(buffer.samples()[1], StereoSample::new(7, 8));
    }

    #[cfg(unix)]
    #[test]
    fn opening_a_named_pipe_does_not_wait_for_a_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.fifo");
        make_fifo(&path);

        for _ in 0..10 {
            let mut source = PipeSource::new(path.clone(), 16);
            let mut buffer = PcmBuffer::new(16);
            assert!(source.is_connected());
            assert!(!source.tick(0.016, &mut buffer));

            // A non-blocking writer can only open while a reader holds the pipe.
            drop(open_writer(&path).expect("reader should be attached"));
            drop(source);
            let err = open_writer(&path).unwrap_err();
            assert_eq!(err.raw_os_error(), Some(libc::ENXIO));
        }
    }

    #[cfg(unix)]
    #[test]
    fn named_pipe_survives_writer_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.fifo");
        make_fifo(&path);

        let mut source = PipeSource::new(path.clone(), 2);
        let mut buffer = PcmBuffer::new(2);

        let mut writer = open_writer(&path).unwrap();
        writer.write_all(&frame_bytes(&[(1, 2), (3, 4)])).unwrap();
        drop(writer);

        assert!(source.tick(0.016, &mut buffer));
        assert_eq!(buffer.samples()[1], StereoSample::new(3, 4));
        // Writer gone: end of stream, but the pipe stays open.
        assert!(!source.tick(0.016, &mut buffer));
        source.update();
        assert!(source.is_connected());

        let mut writer = open_writer(&path).unwrap();
        writer.write_all(&frame_bytes(&[(5, 6), (7, 8)])).unwrap();
        drop(writer);

        assert!(source.tick(0.016, &mut buffer));
        assert_eq!(buffer.samples()[0], StereoSample::new(5, 6));
    }
}

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::config::{VisualizerConfig, DISABLED_SOURCE, PIPE_SOURCE};

mod fifo;
mod host_tap;

pub use fifo::{PipeSource, RECONNECT_INTERVAL};
pub use host_tap::{HostAudioRegistry, HostTapSource};

/// One interleaved stereo frame of signed 16-bit PCM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StereoSample {
    pub l: i16,
    pub r: i16,
}

impl StereoSample {
    pub fn new(l: i16, r: i16) -> Self {
        Self { l, r }
    }
}

/// Fixed-length PCM buffer shared between the active provider and the
/// analysis stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    samples: Vec<StereoSample>,
}

impl PcmBuffer {
    /// Buffer of `len` silent frames.
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Grows with silence or truncates to `len` frames.
    pub fn resize(&mut self, len: usize) {
        self.samples.resize(len, StereoSample::default());
    }

    /// Zero-fills the buffer without changing its length.
    pub fn clear(&mut self) {
        self.samples.fill(StereoSample::default());
    }

    /// True when every frame is zero on both channels.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| s.l == 0 && s.r == 0)
    }

    pub fn samples(&self) -> &[StereoSample] {
        &self.samples
    }

    /// Providers decode straight into this slice.
    pub fn samples_mut(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }
}

/// Which provider the selector currently runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    NoSource,
    PipeSource,
    HostTapSource,
}

/// Provider choice derived purely from the configured source identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Disabled,
    Pipe,
    HostTap(String),
}

impl SourceSelection {
    /// Empty or `"none"` disables capture, `"mpd"` picks the pipe and any
    /// other name taps the host source of that name.
    pub fn from_identifier(id: &str) -> Self {
        if id.is_empty() || id == DISABLED_SOURCE {
            Self::Disabled
        } else if id == PIPE_SOURCE {
            Self::Pipe
        } else {
            Self::HostTap(id.to_string())
        }
    }

    pub fn state(&self) -> SourceState {
        match self {
            Self::Disabled => SourceState::NoSource,
            Self::Pipe => SourceState::PipeSource,
            Self::HostTap(_) => SourceState::HostTapSource,
        }
    }
}

/// A pluggable producer of PCM data.
///
/// Implementations must never block: `tick` either copies a frame that is
/// already available or reports that nothing new arrived.
pub trait AudioProvider: fmt::Debug {
    /// Internal upkeep such as reconnect attempts. Called once per frame
    /// before the selector evaluates the configuration.
    fn update(&mut self) {}

    /// Copies fresh data into `buffer`, returning whether any arrived since
    /// the previous call.
    fn tick(&mut self, seconds: f32, buffer: &mut PcmBuffer) -> bool;

    fn kind(&self) -> SourceState;
}

/// Construction seam used by the selector whenever the source changes.
pub trait ProviderFactory: fmt::Debug {
    fn create(
        &self,
        selection: &SourceSelection,
        config: &VisualizerConfig,
    ) -> Option<Box<dyn AudioProvider>>;
}

/// Builds the real pipe and host-tap providers.
#[derive(Debug, Clone, Default)]
pub struct DefaultProviderFactory {
    host: HostAudioRegistry,
}

impl DefaultProviderFactory {
    pub fn new(host: HostAudioRegistry) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &HostAudioRegistry {
        &self.host
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn create(
        &self,
        selection: &SourceSelection,
        config: &VisualizerConfig,
    ) -> Option<Box<dyn AudioProvider>> {
        match selection {
            SourceSelection::Disabled => None,
            SourceSelection::Pipe => Some(Box::new(PipeSource::new(
                config.fifo_path.clone(),
                config.sample_size,
            ))),
            SourceSelection::HostTap(name) => {
                Some(Box::new(HostTapSource::new(self.host.clone(), name.clone())))
            }
        }
    }
}

/// Latest-frame slot written by a capture thread or host callback and
/// drained by the render thread.
#[derive(Debug, Default)]
pub struct SharedFrame {
    slot: Mutex<FrameSlot>,
}

#[derive(Debug, Default)]
struct FrameSlot {
    samples: Vec<StereoSample>,
    fresh: bool,
}

impl SharedFrame {
    /// Empty slot, already wrapped for sharing with a producer.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replaces the stored frame and marks it fresh.
    pub fn store(&self, samples: &[StereoSample]) {
        match self.slot.lock() {
            Ok(mut slot) => {
                slot.samples.clear();
                slot.samples.extend_from_slice(samples);
                slot.fresh = true;
            }
            Err(_) => tracing::warn!("audio frame slot poisoned; dropping frame"),
        }
    }

    /// Copies a fresh frame into `buffer`. Samples past the end of the stored
    /// frame are zeroed. Returns `false` when nothing new was stored.
    pub fn take_into(&self, buffer: &mut PcmBuffer) -> bool {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(_) => {
                tracing::warn!("audio frame slot poisoned; reporting no data");
                return false;
            }
        };

        if !slot.fresh {
            return false;
        }

        let out = buffer.samples_mut();
        let n = out.len().min(slot.samples.len());
        out[..n].copy_from_slice(&slot.samples[..n]);
        out[n..].fill(StereoSample::default());
        slot.fresh = false;
        true
    }
}

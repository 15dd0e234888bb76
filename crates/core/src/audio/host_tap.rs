use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{AudioProvider, PcmBuffer, SharedFrame, SourceState, StereoSample};

type TapId = u64;

/// In-process hub through which the host exposes its audio-producing
/// sources. Producers `publish` frames by source name; every tap attached to
/// that name receives a copy.
///
/// Cloning yields another handle to the same hub.
#[derive(Clone, Default)]
pub struct HostAudioRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    sources: HashMap<String, HashMap<TapId, Arc<SharedFrame>>>,
    next_tap: TapId,
}

impl HostAudioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a source available for tapping. Registering an existing name is
    /// a no-op.
    pub fn register_source(&self, name: impl Into<String>) {
        if let Some(mut inner) = self.lock() {
            inner.sources.entry(name.into()).or_default();
        }
    }

    /// Removes a source and silently detaches every tap listening to it.
    pub fn remove_source(&self, name: &str) {
        if let Some(mut inner) = self.lock() {
            if let Some(taps) = inner.sources.remove(name) {
                tracing::debug!(source = name, taps = taps.len(), "host source removed");
            }
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .map(|inner| inner.sources.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Delivers one frame to every tap attached to `name`. Returns how many
    /// taps received it.
    pub fn publish(&self, name: &str, samples: &[StereoSample]) -> usize {
        let Some(inner) = self.lock() else {
            return 0;
        };
        match inner.sources.get(name) {
            Some(taps) => {
                for frame in taps.values() {
                    frame.store(samples);
                }
                taps.len()
            }
            None => 0,
        }
    }

    fn attach(&self, name: &str, frame: Arc<SharedFrame>) -> Option<TapId> {
        let mut inner = self.lock()?;
        let id = inner.next_tap;
        let taps = inner.sources.get_mut(name)?;
        taps.insert(id, frame);
        inner.next_tap += 1;
        Some(id)
    }

    fn detach(&self, name: &str, id: TapId) {
        if let Some(mut inner) = self.lock() {
            if let Some(taps) = inner.sources.get_mut(name) {
                taps.remove(&id);
            }
        }
    }

    fn is_attached(&self, name: &str, id: TapId) -> bool {
        let Some(inner) = self.lock() else {
            return false;
        };
        inner
            .sources
            .get(name)
            .is_some_and(|taps| taps.contains_key(&id))
    }

    fn lock(&self) -> Option<MutexGuard<'_, RegistryInner>> {
        match self.inner.lock() {
            Ok(inner) => Some(inner),
            Err(_) => {
                tracing::warn!("host audio registry poisoned");
                None
            }
        }
    }
}

impl std::fmt::Debug for HostAudioRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostAudioRegistry")
            .field("sources", &self.source_names())
            .finish()
    }
}

/// Taps a named host source. A missing source is not an error: the tap
/// reports no data and retries attaching on every `update`.
#[derive(Debug)]
pub struct HostTapSource {
    host: HostAudioRegistry,
    name: String,
    frame: Arc<SharedFrame>,
    tap: Option<TapId>,
}

impl HostTapSource {
    pub fn new(host: HostAudioRegistry, name: String) -> Self {
        let mut source = Self {
            host,
            name,
            frame: SharedFrame::new(),
            tap: None,
        };
        source.try_attach();
        source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_attached(&self) -> bool {
        self.tap.is_some()
    }

    fn try_attach(&mut self) {
        self.tap = self.host.attach(&self.name, Arc::clone(&self.frame));
        match self.tap {
            Some(id) => tracing::debug!(source = %self.name, tap = id, "attached to host source"),
            None => tracing::debug!(source = %self.name, "host source not available yet"),
        }
    }
}

impl AudioProvider for HostTapSource {
    fn update(&mut self) {
        if let Some(id) = self.tap {
            if self.host.is_attached(&self.name, id) {
                return;
            }
            tracing::debug!(source = %self.name, "host source went away");
            self.tap = None;
        }
        self.try_attach();
    }

    fn tick(&mut self, _seconds: f32, buffer: &mut PcmBuffer) -> bool {
        self.tap.is_some() && self.frame.take_into(buffer)
    }

    fn kind(&self) -> SourceState {
        SourceState::HostTapSource
    }
}

impl Drop for HostTapSource {
    fn drop(&mut self) {
        if let Some(id) = self.tap.take() {
            self.host.detach(&self.name, id);
        }
    }
}

use crate::audio::{
    AudioProvider, DefaultProviderFactory, HostAudioRegistry, PcmBuffer, ProviderFactory,
    SourceSelection, SourceState,
};
use crate::config::VisualizerConfig;

/// Owns the active audio provider and swaps it whenever the configured
/// source name changes.
///
/// The host calls [`update`](Self::update) then [`tick`](Self::tick) once per
/// frame. At most one provider is alive at any time; the previous one is
/// dropped before its replacement is built.
#[derive(Debug)]
pub struct AudioVisualizer {
    config: VisualizerConfig,
    factory: Box<dyn ProviderFactory>,
    source: Option<Box<dyn AudioProvider>>,
    source_id: Option<String>,
    buffer: PcmBuffer,
    data_read: bool,
}

impl AudioVisualizer {
    /// Creates a visualizer that taps sources from `host`.
    pub fn new(config: VisualizerConfig, host: HostAudioRegistry) -> Self {
        Self::with_factory(config, Box::new(DefaultProviderFactory::new(host)))
    }

    pub fn with_factory(config: VisualizerConfig, factory: Box<dyn ProviderFactory>) -> Self {
        let buffer = PcmBuffer::new(config.sample_size);
        Self {
            config,
            factory,
            source: None,
            source_id: None,
            buffer,
            data_read: false,
        }
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Mutable access for the host's property layer. Changes take effect on
    /// the next `update`.
    pub fn config_mut(&mut self) -> &mut VisualizerConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: VisualizerConfig) {
        self.config = config;
    }

    pub fn state(&self) -> SourceState {
        self.source
            .as_ref()
            .map(|source| source.kind())
            .unwrap_or(SourceState::NoSource)
    }

    /// Whether the last `tick` delivered fresh data.
    pub fn data_read(&self) -> bool {
        self.data_read
    }

    pub fn pcm(&self) -> &PcmBuffer {
        &self.buffer
    }

    pub fn update(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.update();
        }

        if self.buffer.len() != self.config.sample_size {
            self.buffer.resize(self.config.sample_size);
        }

        if self.source_id.as_deref() == Some(self.config.audio_source_name.as_str()) {
            return;
        }

        let previous = self.state();
        self.source = None;

        let selection = SourceSelection::from_identifier(&self.config.audio_source_name);
        self.source = self.factory.create(&selection, &self.config);
        self.source_id = Some(self.config.audio_source_name.clone());

        tracing::info!(
            source = %self.config.audio_source_name,
            ?previous,
            current = ?self.state(),
            "audio source changed"
        );
    }

    pub fn tick(&mut self, seconds: f32) {
        self.data_read = match self.source.as_mut() {
            Some(source) => source.tick(seconds, &mut self.buffer),
            None => false,
        };

        if self.config.auto_clear && !self.data_read {
            self.buffer.clear();
        }
    }
}

//! Core library for the Spectrum Bars audio visualizer.
//!
//! A host drives one [`BarVisualizer`] per visualizer instance, calling
//! `update`, `tick` and `render` once per frame. `update` swaps the audio
//! provider when the configured source changes, `tick` pulls fresh PCM from
//! it, and `render` turns the per-band magnitudes into positioned bars on a
//! [`RenderBackend`].

pub mod audio;
pub mod bars;
pub mod config;
pub mod error;
pub mod render;
pub mod visualizer;

pub use audio::{
    AudioProvider, DefaultProviderFactory, HostAudioRegistry, HostTapSource, PcmBuffer,
    PipeSource, ProviderFactory, SharedFrame, SourceSelection, SourceState, StereoSample,
};
pub use bars::{
    bar_height_for, bar_x, layout, rounded_rectangle, rounded_vertex_count, BarShape,
    BarVisualizer, Channel,
};
pub use config::{VisualizerConfig, DEAD_BAR_OFFSET, DISABLED_SOURCE, PIPE_SOURCE};
pub use error::{Result, SpectrumError};
pub use render::{
    CommandRecorder, DrawCommand, EffectContext, MatrixScope, PlacedRect, RenderBackend,
    TransientVertexBuffer, Vertex, VertexBufferId,
};
pub use visualizer::AudioVisualizer;

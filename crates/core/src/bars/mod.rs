use serde::Serialize;

use crate::audio::{HostAudioRegistry, ProviderFactory, SourceState};
use crate::config::{VisualizerConfig, DEAD_BAR_OFFSET};
use crate::render::{EffectContext, MatrixScope, RenderBackend, TransientVertexBuffer};
use crate::visualizer::AudioVisualizer;
use crate::Result;

mod rounded;

pub use rounded::{rounded_rectangle, rounded_vertex_count};

/// Which half of the strip a bar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    Mono,
    /// Left channel, drawn above the stereo gap.
    Left,
    /// Right channel, drawn below the stereo gap.
    Right,
}

/// Placement of one bar in visualizer space, y pointing down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarShape {
    pub band: usize,
    pub channel: Channel,
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
}

/// Converts a magnitude into a bar height. Values below 1.0 (NaN included)
/// count as 1.0. `lower` wins over `upper` when the two conflict so that a
/// rounded bar always fits its corner circle.
pub fn bar_height_for(magnitude: f64, lower: u32, upper: u32) -> u32 {
    let value = magnitude.max(1.0);
    (value.round() as u32).min(upper).max(lower)
}

/// Left edge of band `index`.
pub fn bar_x(index: usize, config: &VisualizerConfig) -> f32 {
    let stride = u64::from(config.bar_width) + u64::from(config.bar_space);
    (index as u64 * stride) as f32
}

/// Lays out every renderable band of `left`/`right`. The last
/// [`DEAD_BAR_OFFSET`] entries are never drawn; `right` is only read in
/// stereo mode.
pub fn layout(config: &VisualizerConfig, left: &[f64], right: &[f64]) -> Vec<BarShape> {
    let bands = left.len().saturating_sub(DEAD_BAR_OFFSET);
    let lower = if config.rounded_corners {
        config.bar_width
    } else {
        1
    };
    let upper = config.channel_height();

    let mut shapes = Vec::with_capacity(if config.stereo { bands * 2 } else { bands });
    for (band, &magnitude) in left.iter().enumerate().take(bands) {
        let x = bar_x(band, config);

        if !config.stereo {
            let height = bar_height_for(magnitude, lower, upper);
            shapes.push(BarShape {
                band,
                channel: Channel::Mono,
                x,
                y: config.bar_height as f32 - height as f32,
                width: config.bar_width,
                height,
            });
            continue;
        }

        let offset = i64::from(config.stereo_space / 2);
        let center = i64::from(config.bar_height / 2) + offset;
        let height_l = bar_height_for(magnitude, lower, upper);
        let height_r = bar_height_for(right.get(band).copied().unwrap_or(0.0), lower, upper);

        shapes.push(BarShape {
            band,
            channel: Channel::Left,
            x,
            y: (center - i64::from(height_l) - offset) as f32,
            width: config.bar_width,
            height: height_l,
        });
        shapes.push(BarShape {
            band,
            channel: Channel::Right,
            x,
            y: (center + offset) as f32,
            width: config.bar_width,
            height: height_r,
        });
    }
    shapes
}

/// Spectrum bar visualizer: the audio source selector plus the per-band
/// magnitude buffers it renders.
///
/// Magnitudes are written by the analysis stage through
/// [`bars_mut`](Self::bars_mut) or [`set_magnitudes`](Self::set_magnitudes)
/// between `tick` and `render`.
#[derive(Debug)]
pub struct BarVisualizer {
    audio: AudioVisualizer,
    bars_left: Vec<f64>,
    bars_right: Vec<f64>,
}

impl BarVisualizer {
    pub fn new(config: VisualizerConfig, host: HostAudioRegistry) -> Self {
        Self::from_audio(AudioVisualizer::new(config, host))
    }

    pub fn with_factory(config: VisualizerConfig, factory: Box<dyn ProviderFactory>) -> Self {
        Self::from_audio(AudioVisualizer::with_factory(config, factory))
    }

    pub fn from_audio(audio: AudioVisualizer) -> Self {
        let len = audio.config().buffer_len();
        Self {
            audio,
            bars_left: vec![0.0; len],
            bars_right: vec![0.0; len],
        }
    }

    pub fn audio(&self) -> &AudioVisualizer {
        &self.audio
    }

    pub fn config(&self) -> &VisualizerConfig {
        self.audio.config()
    }

    pub fn config_mut(&mut self) -> &mut VisualizerConfig {
        self.audio.config_mut()
    }

    pub fn state(&self) -> SourceState {
        self.audio.state()
    }

    pub fn update(&mut self) {
        self.audio.update();
    }

    pub fn tick(&mut self, seconds: f32) {
        self.audio.tick(seconds);
    }

    pub fn bars_left(&self) -> &[f64] {
        &self.bars_left
    }

    pub fn bars_right(&self) -> &[f64] {
        &self.bars_right
    }

    /// Both magnitude buffers, resized to the current band count first.
    pub fn bars_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        self.sync_buffers();
        (self.bars_left.as_mut_slice(), self.bars_right.as_mut_slice())
    }

    /// Copies as many magnitudes as fit; remaining slots keep their values.
    pub fn set_magnitudes(&mut self, left: &[f64], right: &[f64]) {
        let (bars_left, bars_right) = self.bars_mut();
        let n = bars_left.len().min(left.len());
        bars_left[..n].copy_from_slice(&left[..n]);
        let n = bars_right.len().min(right.len());
        bars_right[..n].copy_from_slice(&right[..n]);
    }

    /// Shapes the next `render` would draw.
    pub fn layout(&mut self) -> Vec<BarShape> {
        self.sync_buffers();
        layout(self.audio.config(), &self.bars_left, &self.bars_right)
    }

    /// Draws this frame's bars. The effect context is passed through
    /// untouched.
    pub fn render<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        _effect: &EffectContext,
    ) -> Result<()> {
        let shapes = self.layout();
        let config = self.audio.config();

        for shape in &shapes {
            if config.rounded_corners {
                let vertices = rounded_rectangle(shape.width, shape.height, config.corner_points);
                let mut buffer = TransientVertexBuffer::create(&mut *backend, &vertices)?;
                buffer.draw_at(shape.x, shape.y)?;
            } else {
                let mut scope = MatrixScope::new(&mut *backend);
                scope.backend().translate(shape.x, shape.y, 0.0);
                scope.backend().draw_sprite(shape.width, shape.height)?;
            }
        }
        Ok(())
    }

    fn sync_buffers(&mut self) {
        let len = self.audio.config().buffer_len();
        if self.bars_left.len() != len {
            self.bars_left.resize(len, 0.0);
        }
        if self.bars_right.len() != len {
            self.bars_right.resize(len, 0.0);
        }
    }
}

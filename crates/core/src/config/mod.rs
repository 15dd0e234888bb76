use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, SpectrumError};

/// Source identifier that disables audio capture.
pub const DISABLED_SOURCE: &str = "none";

/// Source identifier that selects the named-pipe reader.
pub const PIPE_SOURCE: &str = "mpd";

/// Trailing magnitude slots reserved for provider scratch data. They are
/// never rendered.
pub const DEAD_BAR_OFFSET: usize = 5;

/// Top-level configuration for a single visualizer instance.
///
/// The host owns this value and may change any field between frames; the
/// visualizer re-reads it on every `update`/`render`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Name of the audio source. Empty or [`DISABLED_SOURCE`] turns capture
    /// off, [`PIPE_SOURCE`] reads `fifo_path`, anything else taps a host
    /// source of that name.
    pub audio_source_name: String,
    pub fifo_path: PathBuf,
    /// Stereo frames per PCM buffer.
    pub sample_size: usize,
    /// Number of rendered bands.
    pub detail: u32,
    pub bar_width: u32,
    pub bar_space: u32,
    pub bar_height: u32,
    pub stereo: bool,
    pub stereo_space: u32,
    pub rounded_corners: bool,
    pub corner_points: u32,
    /// Zero the PCM buffer on frames where the provider delivered nothing.
    pub auto_clear: bool,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            audio_source_name: DISABLED_SOURCE.to_string(),
            fifo_path: PathBuf::from("/tmp/mpd.fifo"),
            sample_size: 1024,
            detail: 32,
            bar_width: 5,
            bar_space: 2,
            bar_height: 100,
            stereo: false,
            stereo_space: 0,
            rounded_corners: false,
            corner_points: 5,
            auto_clear: false,
        }
    }
}

impl VisualizerConfig {
    /// Parses and validates a JSON document. Missing fields take their
    /// defaults and unknown fields are ignored.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file, see [`from_json_str`](Self::from_json_str).
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(?path, "loading visualizer configuration");
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Pretty-printed JSON with every field present.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects configurations the visualizer cannot run with and warns about
    /// ones it can only render approximately.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(SpectrumError::InvalidConfig(
                "sample_size must be at least one frame".to_string(),
            ));
        }

        if self.rounded_corners && self.bar_width > self.channel_height() {
            tracing::warn!(
                bar_width = self.bar_width,
                channel_height = self.channel_height(),
                "rounded bars are wider than the available height; bars will overflow"
            );
        }

        Ok(())
    }

    /// Length of each magnitude buffer, dead slots included.
    pub fn buffer_len(&self) -> usize {
        self.detail as usize + DEAD_BAR_OFFSET
    }

    /// Maximum height of a single bar: the full height in mono, half of it
    /// per channel in stereo.
    pub fn channel_height(&self) -> u32 {
        if self.stereo {
            self.bar_height / 2
        } else {
            self.bar_height
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = VisualizerConfig::from_json_str(r#"{ "detail": 8, "stereo": true }"#)
            .expect("partial config should parse");

        assert_eq!(config.detail, 8);
        assert!(config.stereo);
        assert_eq!(config.audio_source_name, DISABLED_SOURCE);
        assert_eq!(config.bar_height, 100);
    }

    #[test]
    fn ignores_fields_it_does_not_know() {
        let config =
            VisualizerConfig::from_json_str(r#"{ "sample_rate": 48000, "sample_size": 512 }"#)
                .expect("unknown fields are skipped");

        assert_eq!(config.sample_size, 512);
        assert!(!config.to_json_string().unwrap().contains("sample_rate"));
    }

    #[test]
    fn rejects_negative_dimensions() {
        let err = VisualizerConfig::from_json_str(r#"{ "bar_width": -3 }"#).unwrap_err();
        assert!(matches!(err, SpectrumError::Json(_)));
    }

    #[test]
    fn rejects_empty_sample_buffer() {
        let err = VisualizerConfig::from_json_str(r#"{ "sample_size": 0 }"#).unwrap_err();
        assert!(format!("{err}").contains("sample_size"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let config = VisualizerConfig {
            audio_source_name: "Desktop Audio".to_string(),
            rounded_corners: true,
            ..Default::default()
        };
        std::io::Write::write_all(&mut file, config.to_json_string().unwrap().as_bytes())
            .unwrap();

        let loaded = VisualizerConfig::from_json_path(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn stereo_halves_the_channel_height() {
        let mut config = VisualizerConfig {
            bar_height: 101,
            ..Default::default()
        };
        assert_eq!(config.channel_height(), 101);

        config.stereo = true;
        assert_eq!(config.channel_height(), 50);
        assert_eq!(config.buffer_len(), 32 + DEAD_BAR_OFFSET);
    }
}

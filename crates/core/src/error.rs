/// Result alias that carries the custom [`SpectrumError`] type.
pub type Result<T> = std::result::Result<T, SpectrumError>;

/// Common error type for the core crate.
///
/// Only configuration loading and the rendering backend can fail. Audio
/// providers and the source selector degrade to "no data" instead.
#[derive(Debug, thiserror::Error)]
pub enum SpectrumError {
    /// Free-form failure reported by a collaborator.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
    /// Configuration parsed but describes an unusable visualizer.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The rendering backend rejected a command.
    #[error("render backend error: {0}")]
    Render(String),
}

impl SpectrumError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Wraps a backend failure message in [`SpectrumError::Render`].
    pub fn render<T: Into<String>>(msg: T) -> Self {
        Self::Render(msg.into())
    }
}

impl From<&str> for SpectrumError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SpectrumError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

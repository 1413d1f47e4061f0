/// Result alias that carries the custom [`ArcadeError`] type.
pub type Result<T> = std::result::Result<T, ArcadeError>;

/// Common error type for the core crate.
///
/// Pool exhaustion is deliberately absent: a full pool is an expected outcome
/// reported through `Option`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum ArcadeError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The audio source or output could not be opened. Fatal at startup.
    #[error("audio initialisation failed: {0}")]
    AudioInit(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// WAV decoding failed.
    #[error("{0}")]
    Wav(#[from] hound::Error),
}

impl ArcadeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for ArcadeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ArcadeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Result alias that carries the custom [`NoteOverlayError`] type.
pub type Result<T> = std::result::Result<T, NoteOverlayError>;

/// Common error type for the core crate.
///
/// The numeric components (note classification and pose smoothing) are total
/// and never produce one of these; only the host-side layers do.
#[derive(Debug, thiserror::Error)]
pub enum NoteOverlayError {
    /// Free-form message, mostly used for poisoned shared state.
    #[error("{0}")]
    Message(String),
    /// A caller handed over data the component cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A configuration value is out of its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or sample files that failed to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Buffer size mismatch reported by the FFT backend.
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
}

impl NoteOverlayError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for NoteOverlayError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for NoteOverlayError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

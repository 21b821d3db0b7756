//! Error types for wavegrad-rs.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Candle tensor error, including failures raised by a denoiser.
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),

    /// Noise schedule or vocoder parameters out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Signal, conditioning or prediction tensors with incompatible shapes.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

//! Error types shared across Vigil crates.

/// Result alias used throughout Vigil.
pub type Result<T> = std::result::Result<T, VigilError>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// Configuration load/parse problems.
    #[error("config error: {0}")]
    Config(String),

    /// Chat-platform (gateway or REST) problems.
    #[error("platform error: {0}")]
    Platform(String),

    /// I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

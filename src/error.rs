use std::io;
use thiserror::Error;

/// Result type for cabin operations
pub type Result<T> = std::result::Result<T, CabinError>;

/// Unified error type for all cabin operations
#[derive(Debug, Error)]
pub enum CabinError {
    // Lookup errors
    #[error("File not found in archive: {0}")]
    NotFound(String),

    // Format errors
    #[error("Malformed directory entry: {0}")]
    MalformedEntry(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // Mapped view errors
    #[error("Out of bounds: requested {requested} bytes, {remaining} remaining")]
    Bounds { requested: u64, remaining: u64 },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CabinError {
    /// Map a short read while decoding into a format error.
    ///
    /// Truncated directory bytes are a property of the archive, not of the
    /// filesystem, so `UnexpectedEof` is reported as `MalformedEntry`.
    pub(crate) fn from_decode(err: io::Error, context: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            CabinError::MalformedEntry(format!("{}: unexpected end of data", context))
        } else {
            CabinError::Io(err)
        }
    }
}

impl From<toml::de::Error> for CabinError {
    fn from(err: toml::de::Error) -> Self {
        CabinError::Config(err.to_string())
    }
}

impl From<CabinError> for io::Error {
    fn from(err: CabinError) -> Self {
        match err {
            CabinError::Io(inner) => inner,
            CabinError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, err),
            CabinError::Bounds { .. } => io::Error::new(io::ErrorKind::WriteZero, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

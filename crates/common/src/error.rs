//! Common error types for satprep.

use thiserror::Error;

/// Common error type for satprep operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Auth file {path} has mode {mode:o}, expected 600")]
    AuthFileMode { path: String, mode: u32 },

    #[error("Unable to resolve targets: {0}")]
    Resolution(String),

    #[error("Unsupported API level: {version}")]
    UnsupportedApi { version: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

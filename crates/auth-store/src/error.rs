//! Error types for the persistence and credential layer

use thiserror::Error;

/// Errors from store, directory, token, and rotation operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    /// Distinguished so loaders can translate it into "return default".
    #[error("document not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("user already exists: {0}")]
    Conflict(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound
        } else {
            Error::Io(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serde(e.to_string())
    }
}

/// Result alias using the store `Error`.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the Alice proposal assistant.

use thiserror::Error;

/// Result type alias using Alice's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for analysis and conversation operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network failure or timeout talking to the remote inference service
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote inference service answered with a non-success status
    #[error("Remote service returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// Resource (usually a stored file) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single record could not be stored
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// An analysis run could not load a single file
    #[error("No files available for analysis ({requested} requested, 0 loaded)")]
    NoFilesAvailable { requested: usize },

    /// A chat turn failed while calling the remote service
    #[error("Conversation error at {endpoint}: {reason}")]
    Conversation {
        endpoint: String,
        message: String,
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (caller error, detected before any network call)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the failure came from the network or the remote service.
    ///
    /// These are surfaced to the user as retryable; nothing in this workspace
    /// retries them automatically.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Remote { .. } | Error::Conversation { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Transport(format!("request timed out: {}", e))
        } else {
            Error::Transport(e.to_string())
        }
    }
}

// Error types shared by every layer of the client. Remote failures carry the
// name of the operation that failed so the navigator can report them as-is.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Credentials missing, rejected or expired. The session is unusable.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Any network or API failure while talking to Classroom or Drive.
    #[error("failed to {operation}: {message}")]
    RemoteFetch { operation: String, message: String },

    /// An item the service returned cannot be ordered in the feed.
    #[error("malformed item {id}: {message}")]
    MalformedData { id: String, message: String },

    /// The download destination could not be created or written.
    #[error("cannot write {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// External viewer program missing or exited badly.
    #[error("cannot launch {0}")]
    Launch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn remote(operation: impl Into<String>, message: impl ToString) -> Self {
        Error::RemoteFetch {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Errors that end the session instead of sending the user one menu up.
    /// `Io` here means the terminal itself failed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Auth(_) | Error::Io(_))
    }
}

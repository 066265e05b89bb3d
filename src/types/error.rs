//! Error types for davsync

use thiserror::Error;

/// Error types for davsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration, detected before any work starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stat or directory listing failed while building the task list
    #[error("Enumeration failed at {path}: {reason}")]
    Enumeration { path: String, reason: String },

    /// The source tree holds something that is neither a file nor a directory
    #[error("Unsupported file type: {path}")]
    UnsupportedFileType { path: String },

    /// A worker could not establish its remote session
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Remote protocol failure during a single transfer
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Worker pool infrastructure failure (closed queues, lost results)
    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl SyncError {
    /// Check if this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_)
                | SyncError::Enumeration { .. }
                | SyncError::UnsupportedFileType { .. }
                | SyncError::Connection(_)
                | SyncError::Pool(_)
        )
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::Config(_))
    }
}

/// Failures reported by a remote protocol client.
///
/// `NotFound` is kept apart from everything else because change detection
/// treats a missing destination as the normal "must transfer" case.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{path}: {message}")]
    Other { path: String, message: String },
}

impl RemoteError {
    pub fn other(path: impl Into<String>, message: impl ToString) -> Self {
        RemoteError::Other {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

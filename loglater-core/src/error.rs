//! Error types for LogLater operations

/// Result type for LogLater operations
pub type Result<T> = std::result::Result<T, LogLaterError>;

/// Error types for capture, storage and replay
#[derive(Debug, thiserror::Error)]
pub enum LogLaterError {
    /// The event handed to the collector could not be turned into a record
    #[error("Record creation failed: {0}")]
    RecordCreationFailed(String),

    /// Replay was invoked without a target handler
    #[error("Replay requires a target handler")]
    HandlerRequired,

    /// Replay was cancelled between records
    #[error("Replay canceled")]
    Canceled,

    /// Replay ran past its deadline
    #[error("Replay deadline exceeded")]
    DeadlineExceeded,

    /// Raised by a handler while handling an event
    #[error("Handler error: {0}")]
    Handler(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LogLaterError {
    /// Build a handler error from any displayable cause
    pub fn handler(cause: impl std::fmt::Display) -> Self {
        LogLaterError::Handler(cause.to_string())
    }

    /// Whether this error came from a replay being cut short
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LogLaterError::Canceled | LogLaterError::DeadlineExceeded)
    }
}

impl From<String> for LogLaterError {
    fn from(s: String) -> Self {
        LogLaterError::Other(s)
    }
}

impl From<&str> for LogLaterError {
    fn from(s: &str) -> Self {
        LogLaterError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for LogLaterError {
    fn from(err: anyhow::Error) -> Self {
        LogLaterError::Other(err.to_string())
    }
}

use thiserror::Error;

/// Core error types for imagefork request parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unsupported channel: {0}")]
    InvalidChannel(String),

    #[error("Invalid poster id: {0}")]
    InvalidPosterId(String),
}

impl CoreError {
    /// Create a new InvalidChannel error
    pub fn invalid_channel(channel: impl Into<String>) -> Self {
        Self::InvalidChannel(channel.into())
    }

    /// Create a new InvalidPosterId error
    pub fn invalid_poster_id(id: impl Into<String>) -> Self {
        Self::InvalidPosterId(id.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

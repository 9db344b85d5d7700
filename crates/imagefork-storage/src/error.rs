//! Storage error types.

use std::fmt;

/// Errors that can occur while talking to the binding store or asset table.
///
/// All of these are transient from the caller's point of view: the router
/// logs them and answers with the error bundle. Nothing retries.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The backend did not answer in time.
    #[error("Timeout: {message}")]
    Timeout {
        /// Description of the timed out operation.
        message: String,
    },

    /// The backend rejected or failed a query.
    #[error("Query error: {message}")]
    Query {
        /// Description of the query error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new `Query` error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => ErrorCategory::Infrastructure,
            Self::Query { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::timeout("pool acquire");
        assert_eq!(err.to_string(), "Timeout: pool acquire");

        let err = StorageError::connection("refused");
        assert_eq!(err.to_string(), "Connection error: refused");
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::timeout("t").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            StorageError::connection("c").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(StorageError::query("q").category(), ErrorCategory::Internal);
        assert_eq!(ErrorCategory::Internal.to_string(), "internal");
    }
}

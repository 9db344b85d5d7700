//! Error types for the PostgreSQL storage backend.

use imagefork_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Sqlx(e) => storage_error(e),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Classifies a sqlx error for the resolution path.
pub(crate) fn storage_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::PoolTimedOut => StorageError::timeout("timed out acquiring a connection"),
        SqlxError::PoolClosed => StorageError::connection("connection pool is closed"),
        SqlxError::Io(e) => StorageError::connection(e.to_string()),
        SqlxError::Tls(e) => StorageError::connection(e.to_string()),
        other => StorageError::query(other.to_string()),
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_pool_timeout_is_a_timeout() {
        let err = storage_error(SqlxError::PoolTimedOut);
        assert!(matches!(err, StorageError::Timeout { .. }));
    }

    #[test]
    fn test_io_error_is_a_connection_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = storage_error(SqlxError::Io(io));
        assert!(matches!(err, StorageError::Connection { .. }));
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let pg_err = PostgresError::config("test error");
        let storage_err: StorageError = pg_err.into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));
    }
}

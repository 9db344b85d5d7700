use imagefork_core::CoreError;
use imagefork_db_postgres::PostgresError;

/// Failures while assembling or running the server.
///
/// Request handling never produces these; every per-request failure is
/// answered with a baked poster instead.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] PostgresError),

    #[error("invalid seed data: {0}")]
    Seed(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

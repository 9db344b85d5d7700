//! Token binding queries.

use imagefork_core::{PosterId, TokenHash};
use imagefork_storage::{BindingResolution, StorageError};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use crate::error::storage_error;

/// Claim-or-lookup in a single statement.
///
/// `touched` refreshes an existing binding. Only when there is none does
/// `claimed` insert a row for one random servable poster; `ON CONFLICT`
/// resolves a concurrent first insert to the winner's poster instead of
/// rolling a new one. When nothing is servable and nothing is bound the
/// statement yields no row and writes nothing.
const RESOLVE_SQL: &str = r#"
WITH touched AS (
    UPDATE poster_tokens
       SET last_used = now()
     WHERE hash = $1
 RETURNING poster
),
claimed AS (
    INSERT INTO poster_tokens (hash, poster, last_used)
    SELECT $1, p.id, now()
      FROM posters p
     WHERE p.servable
       AND NOT EXISTS (SELECT 1 FROM touched)
     ORDER BY random()
     LIMIT 1
    ON CONFLICT (hash) DO UPDATE SET last_used = now()
    RETURNING poster, (xmax = 0) AS created
)
SELECT poster, false AS created FROM touched
UNION ALL
SELECT poster, created FROM claimed
"#;

/// Resolves the poster bound to `hash`, binding one if needed.
pub async fn resolve(pool: &PgPool, hash: &TokenHash) -> Result<BindingResolution, StorageError> {
    let row: Option<(i64, bool)> = query_as(RESOLVE_SQL)
        .bind(hash.as_str())
        .fetch_optional(pool)
        .await
        .map_err(storage_error)?;

    Ok(match row {
        Some((poster, true)) => BindingResolution::created(PosterId(poster)),
        Some((poster, false)) => BindingResolution::existing(PosterId(poster)),
        None => BindingResolution::unbound(),
    })
}

//! Material lookups.

use imagefork_core::{Channel, PosterId};
use imagefork_storage::StorageError;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;

use crate::error::storage_error;

/// Returns the URL `poster` supplies for `channel`, if any.
pub async fn material_url(
    pool: &PgPool,
    poster: PosterId,
    channel: Channel,
) -> Result<Option<String>, StorageError> {
    query_scalar("SELECT url FROM poster_image WHERE poster = $1 AND kind = $2")
        .bind(poster.get())
        .bind(channel.as_kind())
        .fetch_optional(pool)
        .await
        .map_err(storage_error)
}

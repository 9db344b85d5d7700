//! `BindingStore` / `AssetTable` implementation over a PostgreSQL pool.

use async_trait::async_trait;
use imagefork_core::{Channel, PosterId, TokenHash};
use imagefork_storage::{AssetTable, BindingResolution, BindingStore, StorageError};
use sqlx_postgres::PgPool;
use tracing::instrument;

use crate::config::PostgresConfig;
use crate::error::{Result, storage_error};
use crate::pool::create_pool;
use crate::queries;

/// PostgreSQL-backed binding store and asset table.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connects a new pool from configuration.
    pub async fn new(config: &PostgresConfig) -> Result<Self> {
        Ok(Self::from_pool(create_pool(config).await?))
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BindingStore for PostgresStorage {
    #[instrument(skip(self), fields(hash = %hash))]
    async fn resolve(&self, hash: &TokenHash) -> std::result::Result<BindingResolution, StorageError> {
        queries::binding::resolve(&self.pool, hash).await
    }

    async fn ping(&self) -> std::result::Result<(), StorageError> {
        sqlx_core::query::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl AssetTable for PostgresStorage {
    #[instrument(skip(self))]
    async fn material_url(
        &self,
        poster: PosterId,
        channel: Channel,
    ) -> std::result::Result<Option<String>, StorageError> {
        queries::material::material_url(&self.pool, poster, channel).await
    }
}

pub mod assets;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod config_watch;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod redirect;
pub mod server;

pub use assets::{AssetError, AssetStore, DirectoryAssetStore, MemoryAssetStore, StaticAsset};
pub use cache::{
    CachedResponse, EdgeResponseCache, LocalSharedCache, RedisSharedCache, RequestKey,
    SharedCache,
};
pub use circuit_breaker::CircuitBreaker;
pub use config::{AppConfig, RedirectConfig, RedisConfig, StorageBackend};
pub use error::ServerError;
pub use observability::init_tracing;
pub use redirect::RequestRouter;
pub use server::{AppState, ImageforkServer, ServerBuilder, build_app};

use std::sync::Arc;

use cache::DynSharedCache;

/// Per-node token cache with its expiry sweep running.
fn local_shared_cache(config: &RedisConfig) -> DynSharedCache {
    let cache = Arc::new(LocalSharedCache::with_max_entries(config.local_max_entries));
    LocalSharedCache::start_cleanup_task(
        &cache,
        std::time::Duration::from_secs(config.local_cleanup_interval_secs),
    );
    cache
}

/// Create the shared token cache based on configuration.
///
/// - **Redis disabled**: per-node cache (DashMap)
/// - **Redis enabled**: connects to Redis, falls back to per-node on failure
///
/// Falling back keeps the node serving; bindings stay consistent because the
/// binding store, not the cache, decides which poster a token gets.
pub async fn create_shared_cache(config: &RedisConfig) -> DynSharedCache {
    use std::time::Duration;

    if !config.enabled {
        tracing::info!("Redis disabled, using local token cache");
        return local_shared_cache(config);
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let pool_config = redis_config
        .pool
        .get_or_insert_with(deadpool_redis::PoolConfig::default);
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local token cache."
            );
            return local_shared_cache(config);
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            Arc::new(RedisSharedCache::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local token cache."
            );
            local_shared_cache(config)
        }
    }
}

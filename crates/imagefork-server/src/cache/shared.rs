//! Shared token cache with Redis and local implementations.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use deadpool_redis::Pool;
use imagefork_core::{PosterId, TokenHash};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key namespace for token entries in Redis.
pub const TOKEN_KEY_PREFIX: &str = "imagefork:token:";

#[derive(Debug, thiserror::Error)]
pub enum SharedCacheError {
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis command error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Cross-request cache of token bindings.
///
/// Never authoritative: a miss or an error falls through to the binding store.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Returns the cached poster and pushes the entry's expiry out to `ttl`.
    async fn get_if_present(
        &self,
        hash: &TokenHash,
        ttl: Duration,
    ) -> Result<Option<PosterId>, SharedCacheError>;

    /// Stores `poster` unless an entry exists; returns whichever value is now cached.
    async fn set_if_absent(
        &self,
        hash: &TokenHash,
        poster: PosterId,
        ttl: Duration,
    ) -> Result<PosterId, SharedCacheError>;

    /// Short backend name for logs.
    fn mode(&self) -> &'static str;
}

pub type DynSharedCache = Arc<dyn SharedCache>;

fn token_key(hash: &TokenHash) -> String {
    format!("{TOKEN_KEY_PREFIX}{hash}")
}

/// Redis-backed cache shared by every edge node.
#[derive(Clone)]
pub struct RedisSharedCache {
    pool: Pool,
}

impl RedisSharedCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SharedCache for RedisSharedCache {
    async fn get_if_present(
        &self,
        hash: &TokenHash,
        ttl: Duration,
    ) -> Result<Option<PosterId>, SharedCacheError> {
        let mut conn = self.pool.get().await?;
        let value: Option<i64> = redis::cmd("GETEX")
            .arg(token_key(hash))
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(value.map(PosterId))
    }

    async fn set_if_absent(
        &self,
        hash: &TokenHash,
        poster: PosterId,
        ttl: Duration,
    ) -> Result<PosterId, SharedCacheError> {
        let mut conn = self.pool.get().await?;
        // NX + GET: returns the previous value when the key already existed.
        let previous: Option<i64> = redis::cmd("SET")
            .arg(token_key(hash))
            .arg(poster.get())
            .arg("NX")
            .arg("GET")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(previous.map(PosterId).unwrap_or(poster))
    }

    fn mode(&self) -> &'static str {
        "redis"
    }
}

#[derive(Debug, Clone, Copy)]
struct LocalEntry {
    poster: PosterId,
    expires_at: Instant,
}

impl LocalEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Default cap on tokens held by a [`LocalSharedCache`].
pub const DEFAULT_LOCAL_MAX_ENTRIES: usize = 100_000;

/// Per-node cache for single-instance deployments.
///
/// Expired entries are dropped on access and by [`cleanup_expired`](Self::cleanup_expired);
/// at `max_entries` new tokens are not cached until a sweep frees room.
pub struct LocalSharedCache {
    entries: DashMap<TokenHash, LocalEntry>,
    max_entries: usize,
}

impl Default for LocalSharedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSharedCache {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_LOCAL_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every expired entry; returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Sweeps expired entries every `every` until the cache is dropped.
    pub fn start_cleanup_task(this: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(this);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = cache.len(), "local token cache swept");
                }
            }
        })
    }

    /// True when a new token may be inserted, sweeping first if the cache is full.
    fn has_room_for(&self, hash: &TokenHash) -> bool {
        if self.entries.len() < self.max_entries || self.entries.contains_key(hash) {
            return true;
        }
        self.cleanup_expired();
        self.entries.len() < self.max_entries
    }
}

#[async_trait]
impl SharedCache for LocalSharedCache {
    async fn get_if_present(
        &self,
        hash: &TokenHash,
        ttl: Duration,
    ) -> Result<Option<PosterId>, SharedCacheError> {
        let now = Instant::now();
        let Some(mut entry) = self.entries.get_mut(hash) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove_if(hash, |_, e| e.is_expired(now));
            return Ok(None);
        }
        entry.expires_at = now + ttl;
        Ok(Some(entry.poster))
    }

    async fn set_if_absent(
        &self,
        hash: &TokenHash,
        poster: PosterId,
        ttl: Duration,
    ) -> Result<PosterId, SharedCacheError> {
        if !self.has_room_for(hash) {
            tracing::warn!(
                max_entries = self.max_entries,
                "local token cache at capacity, skipping insertion"
            );
            return Ok(poster);
        }

        let now = Instant::now();
        match self.entries.entry(hash.clone()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                occupied.get_mut().expires_at = now + ttl;
                Ok(occupied.get().poster)
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(LocalEntry {
                    poster,
                    expires_at: now + ttl,
                });
                Ok(poster)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LocalEntry {
                    poster,
                    expires_at: now + ttl,
                });
                Ok(poster)
            }
        }
    }

    fn mode(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_token_key_is_namespaced() {
        let hash = TokenHash::of("abc");
        assert_eq!(token_key(&hash), format!("imagefork:token:{}", hash.as_str()));
    }

    #[tokio::test]
    async fn test_local_set_if_absent_keeps_first_value() {
        let cache = LocalSharedCache::new();
        let hash = TokenHash::of("abc");

        assert_eq!(cache.get_if_present(&hash, TTL).await.unwrap(), None);
        assert_eq!(
            cache.set_if_absent(&hash, PosterId(42), TTL).await.unwrap(),
            PosterId(42)
        );
        assert_eq!(
            cache.set_if_absent(&hash, PosterId(7), TTL).await.unwrap(),
            PosterId(42)
        );
        assert_eq!(
            cache.get_if_present(&hash, TTL).await.unwrap(),
            Some(PosterId(42))
        );
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_local_entries_expire() {
        let cache = LocalSharedCache::new();
        let hash = TokenHash::of("short");
        let ttl = Duration::from_millis(50);

        cache.set_if_absent(&hash, PosterId(1), ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get_if_present(&hash, ttl).await.unwrap(), None);
        assert!(cache.is_empty());

        // An expired entry no longer blocks a new write.
        assert_eq!(
            cache.set_if_absent(&hash, PosterId(2), TTL).await.unwrap(),
            PosterId(2)
        );
    }

    #[tokio::test]
    async fn test_cleanup_reclaims_unvisited_entries() {
        let cache = LocalSharedCache::new();
        let ttl = Duration::from_millis(10);
        for i in 0..5000 {
            let hash = TokenHash::of(&format!("fresh-{i}"));
            cache.set_if_absent(&hash, PosterId(i), ttl).await.unwrap();
        }
        let live = TokenHash::of("live");
        cache.set_if_absent(&live, PosterId(1), TTL).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.cleanup_expired(), 5000);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_if_present(&live, TTL).await.unwrap(), Some(PosterId(1)));
    }

    #[tokio::test]
    async fn test_background_sweep_drops_expired_entries() {
        let cache = Arc::new(LocalSharedCache::new());
        let _sweep = LocalSharedCache::start_cleanup_task(&cache, Duration::from_millis(20));
        for i in 0..100 {
            let hash = TokenHash::of(&format!("swept-{i}"));
            cache
                .set_if_absent(&hash, PosterId(i), Duration::from_millis(10))
                .await
                .unwrap();
        }

        let mut drained = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if cache.is_empty() {
                drained = true;
                break;
            }
        }
        assert!(drained, "sweep left {} entries", cache.len());
    }

    #[tokio::test]
    async fn test_capacity_evicts_expired_before_refusing() {
        let cache = LocalSharedCache::with_max_entries(2);
        let short = Duration::from_millis(10);
        cache.set_if_absent(&TokenHash::of("a"), PosterId(1), short).await.unwrap();
        cache.set_if_absent(&TokenHash::of("b"), PosterId(2), TTL).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // "a" expired, so "c" takes its slot.
        let c = TokenHash::of("c");
        assert_eq!(cache.set_if_absent(&c, PosterId(3), TTL).await.unwrap(), PosterId(3));
        assert_eq!(cache.len(), 2);

        // Full of live entries: the write is answered but not cached.
        let d = TokenHash::of("d");
        assert_eq!(cache.set_if_absent(&d, PosterId(4), TTL).await.unwrap(), PosterId(4));
        assert_eq!(cache.get_if_present(&d, TTL).await.unwrap(), None);
        assert_eq!(cache.len(), 2);

        // Existing keys are still answered at capacity.
        assert_eq!(cache.set_if_absent(&c, PosterId(9), TTL).await.unwrap(), PosterId(3));
    }

    #[tokio::test]
    async fn test_local_reads_slide_expiry() {
        let cache = LocalSharedCache::new();
        let hash = TokenHash::of("hot");
        let ttl = Duration::from_millis(120);

        cache.set_if_absent(&hash, PosterId(5), ttl).await.unwrap();
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(60)).await;
            assert_eq!(
                cache.get_if_present(&hash, ttl).await.unwrap(),
                Some(PosterId(5))
            );
        }
    }
}

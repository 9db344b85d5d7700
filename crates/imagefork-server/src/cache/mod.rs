//! Caching tiers in front of the binding store.
//!
//! - [`SharedCache`]: token hash -> poster id, shared across nodes (Redis) or
//!   per-node (DashMap). Sliding TTL, set-if-absent writes.
//! - [`EdgeResponseCache`]: fully rendered responses keyed by request, per node.

pub mod edge;
pub mod shared;

pub use edge::{CachedResponse, EdgeResponseCache, RequestKey, ResponseBody, RouteKind};
pub use shared::{
    DEFAULT_LOCAL_MAX_ENTRIES, DynSharedCache, LocalSharedCache, RedisSharedCache, SharedCache,
    SharedCacheError,
};

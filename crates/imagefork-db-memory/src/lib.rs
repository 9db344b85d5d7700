//! In-memory storage backend for imagefork.
//!
//! Implements [`BindingStore`] and [`AssetTable`] over `DashMap`s. Used for
//! single-node local runs (`storage.backend = "memory"`) and as the store
//! behind the server's integration tests.
//!
//! # Example
//!
//! ```ignore
//! use imagefork_core::{Channel, PosterId, TokenHash};
//! use imagefork_db_memory::InMemoryStorage;
//! use imagefork_storage::BindingStore;
//!
//! let storage = InMemoryStorage::new();
//! storage.add_poster(PosterId(42), true);
//! storage.put_material(PosterId(42), Channel::Albedo, "http://x/a.png");
//!
//! let resolution = storage.resolve(&TokenHash::of("abc")).await?;
//! assert_eq!(resolution.poster_id, Some(PosterId(42)));
//! ```

mod seed;
mod storage;

pub use imagefork_storage::{AssetTable, BindingStore, StorageError};
pub use seed::{SeedConfig, SeedPoster};
pub use storage::InMemoryStorage;

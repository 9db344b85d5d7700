//! # imagefork-storage
//!
//! Storage seam for token resolution.
//!
//! Two read paths back every redirect:
//! - [`BindingStore`]: atomic claim-or-lookup of the poster bound to a token hash
//! - [`AssetTable`]: point lookup of the material URL a poster supplies for a channel
//!
//! Implementations live in separate crates (`imagefork-db-postgres`,
//! `imagefork-db-memory`). Both traits are object safe so the server can hold
//! them as `Arc<dyn ...>` and tests can swap in doubles.
//!
//! ```ignore
//! use imagefork_core::{Channel, TokenHash};
//! use imagefork_storage::{AssetTable, BindingStore, StorageError};
//!
//! async fn url_for(
//!     bindings: &dyn BindingStore,
//!     assets: &dyn AssetTable,
//!     token: &str,
//! ) -> Result<Option<String>, StorageError> {
//!     let resolution = bindings.resolve(&TokenHash::of(token)).await?;
//!     match resolution.poster_id {
//!         Some(poster) => assets.material_url(poster, Channel::Albedo).await,
//!         None => Ok(None),
//!     }
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{AssetTable, BindingStore};
pub use types::BindingResolution;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared binding store handle.
pub type DynBindingStore = std::sync::Arc<dyn BindingStore>;

/// Shared asset table handle.
pub type DynAssetTable = std::sync::Arc<dyn AssetTable>;

//! Storage traits for token resolution.

use async_trait::async_trait;
use imagefork_core::{Channel, PosterId, TokenHash};

use crate::error::StorageError;
use crate::types::BindingResolution;

/// Authoritative store of token bindings.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Claims a poster for `hash` or returns the one already bound.
    ///
    /// When no binding exists, one uniformly random servable poster is chosen
    /// at insert time and bound. When a binding exists only its last-used
    /// timestamp is refreshed and the stored poster is returned unchanged.
    /// Claim and lookup happen atomically: concurrent first-time callers for
    /// the same hash all observe the same poster.
    ///
    /// Returns [`BindingResolution::unbound`] and records nothing when no
    /// poster is servable.
    ///
    /// # Errors
    ///
    /// Returns an error for infrastructure issues (unavailable, timeout).
    async fn resolve(&self, hash: &TokenHash) -> Result<BindingResolution, StorageError>;

    /// Cheap liveness probe used by readiness checks.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Read-only view of poster materials.
#[async_trait]
pub trait AssetTable: Send + Sync {
    /// Returns the material URL `poster` supplies for `channel`.
    ///
    /// `None` is an expected state: the poster lacks a material for that slot.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn material_url(
        &self,
        poster: PosterId,
        channel: Channel,
    ) -> Result<Option<String>, StorageError>;
}

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use imagefork_core::{Binding, Channel, CoreError, PosterId, TokenHash};
use imagefork_storage::{AssetTable, BindingResolution, BindingStore, StorageError};
use rand::seq::SliceRandom;
use tracing::debug;

use crate::seed::SeedConfig;

/// In-memory binding store and asset table.
///
/// Claim-or-lookup runs under the entry lock of the binding's shard, so two
/// concurrent first-time resolutions of the same hash cannot both pick a poster.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// Poster id -> servable flag
    posters: DashMap<PosterId, bool>,
    materials: DashMap<(PosterId, Channel), String>,
    bindings: DashMap<TokenHash, Binding>,
}

impl InMemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidChannel` for a material keyed by an unknown channel code.
    pub fn seeded(seed: &SeedConfig) -> Result<Self, CoreError> {
        let storage = Self::new();
        for poster in &seed.posters {
            let id = PosterId(poster.id);
            storage.add_poster(id, poster.servable);
            for (code, url) in &poster.materials {
                let channel: Channel = code.parse()?;
                storage.put_material(id, channel, url.clone());
            }
        }
        Ok(storage)
    }

    pub fn add_poster(&self, id: PosterId, servable: bool) {
        self.posters.insert(id, servable);
    }

    /// Flips the servable flag. Unknown posters are ignored.
    pub fn set_servable(&self, id: PosterId, servable: bool) {
        if let Some(mut flag) = self.posters.get_mut(&id) {
            *flag = servable;
        }
    }

    pub fn put_material(&self, id: PosterId, channel: Channel, url: impl Into<String>) {
        self.materials.insert((id, channel), url.into());
    }

    /// Current binding for a hash, if any.
    pub fn binding(&self, hash: &TokenHash) -> Option<Binding> {
        self.bindings.get(hash).map(|b| b.clone())
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    fn pick_servable(&self) -> Option<PosterId> {
        let servable: Vec<PosterId> = self
            .posters
            .iter()
            .filter(|entry| *entry.value())
            .map(|entry| *entry.key())
            .collect();
        servable.choose(&mut rand::thread_rng()).copied()
    }
}

#[async_trait]
impl BindingStore for InMemoryStorage {
    async fn resolve(&self, hash: &TokenHash) -> Result<BindingResolution, StorageError> {
        match self.bindings.entry(hash.clone()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().touch();
                Ok(BindingResolution::existing(existing.get().poster_id))
            }
            Entry::Vacant(vacant) => match self.pick_servable() {
                Some(poster_id) => {
                    vacant.insert(Binding::new(hash.clone(), poster_id));
                    debug!(hash = %hash, poster_id = %poster_id, "binding created");
                    Ok(BindingResolution::created(poster_id))
                }
                None => Ok(BindingResolution::unbound()),
            },
        }
    }
}

#[async_trait]
impl AssetTable for InMemoryStorage {
    async fn material_url(
        &self,
        poster: PosterId,
        channel: Channel,
    ) -> Result<Option<String>, StorageError> {
        Ok(self.materials.get(&(poster, channel)).map(|url| url.clone()))
    }
}

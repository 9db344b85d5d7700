//! Token and poster resolution routes.
//!
//! `/redirect/{token}[/{channel}]` walks the full resolution path:
//! channel validation, response cache, diagnostic token, circuit breaker,
//! shared cache, binding store, asset table. `/poster/{id}[/{channel}]`
//! skips token binding and reads the asset table only.
//!
//! Every path ends in an image: a redirect to a live material or a baked
//! poster from the asset store. Cache population runs in a detached task
//! after the response is fixed.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use imagefork_core::{BakedBundle, Channel, FallbackChain, Outcome, PosterId, TokenHash};
use imagefork_storage::{DynAssetTable, DynBindingStore, StorageError};
use tracing::{debug, error, instrument, warn};

use crate::assets::{AssetError, DynAssetStore};
use crate::cache::{CachedResponse, DynSharedCache, EdgeResponseCache, RequestKey};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::RedirectConfig;
use crate::metrics::{self, SharedCacheAction};
use crate::server::AppState;

const NO_CACHE: &str = "no-cache";
const NO_STORE: &str = "no-store";

/// Result of the live lookup for one token.
#[derive(Debug)]
struct Resolution {
    outcome: Outcome,
    /// Poster read from the binding store, to be written to the shared cache.
    bound: Option<PosterId>,
}

impl Resolution {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            bound: None,
        }
    }
}

/// Orchestrates caches, stores and fallbacks for the resolution routes.
pub struct RequestRouter {
    bindings: DynBindingStore,
    materials: DynAssetTable,
    shared_cache: DynSharedCache,
    edge_cache: EdgeResponseCache,
    assets: DynAssetStore,
    breaker: CircuitBreaker,
    config: RedirectConfig,
}

impl RequestRouter {
    pub fn new(
        bindings: DynBindingStore,
        materials: DynAssetTable,
        shared_cache: DynSharedCache,
        assets: DynAssetStore,
        breaker: CircuitBreaker,
        config: RedirectConfig,
    ) -> Self {
        Self {
            bindings,
            materials,
            shared_cache,
            edge_cache: EdgeResponseCache::new(config.response_cache_max_entries),
            assets,
            breaker,
            config,
        }
    }

    pub fn edge_cache(&self) -> &EdgeResponseCache {
        &self.edge_cache
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn redirect(&self, token: &str, channel: Option<&str>) -> Response {
        let Ok(channel) = Channel::parse(channel) else {
            return self.invalid_channel().await;
        };

        let key = RequestKey::redirect(token, channel);
        if let Some(hit) = self.cached(&key).await {
            return hit;
        }

        if token == self.config.diagnostic_token {
            return self.uncached(Outcome::Diagnostic, channel).await;
        }
        if self.breaker.is_tripped() {
            return self.uncached(Outcome::BackendDisabled, channel).await;
        }

        let hash = TokenHash::of(token);
        let resolution = self.resolve(&hash, channel).await;
        metrics::record_outcome(&resolution.outcome);

        match self.render(&resolution.outcome, channel).await {
            Ok(response) => {
                let edge = is_cacheable(&resolution.outcome).then(|| (key, response.clone()));
                let binding = resolution.bound.map(|poster| (hash, poster));
                self.populate(edge, binding);
                response.into_response()
            }
            Err(e) => {
                // Binding was still established; keep the shared cache in step.
                self.populate(None, resolution.bound.map(|poster| (hash, poster)));
                asset_failure(&e)
            }
        }
    }

    pub async fn poster(&self, poster_id: &str, channel: Option<&str>) -> Response {
        let Ok(channel) = Channel::parse(channel) else {
            return self.invalid_channel().await;
        };

        let key = RequestKey::poster(poster_id, channel);
        if let Some(hit) = self.cached(&key).await {
            return hit;
        }

        if self.breaker.is_tripped() {
            return self.uncached(Outcome::BackendDisabled, channel).await;
        }

        let outcome = match poster_id.parse::<PosterId>() {
            Ok(poster) => match self.materials.material_url(poster, channel).await {
                Ok(Some(url)) => Outcome::Found(url),
                Ok(None) => Outcome::NoMaterial,
                Err(e) => {
                    store_failure("asset table", &e);
                    metrics::record_outcome(&Outcome::Failed);
                    // Direct lookups fall back to the default poster, flagged as a failure.
                    return self
                        .bundle(BakedBundle::Default, channel, StatusCode::INTERNAL_SERVER_ERROR)
                        .await
                        .map(IntoResponse::into_response)
                        .unwrap_or_else(|e| asset_failure(&e));
                }
            },
            Err(_) => Outcome::NoPoster,
        };
        metrics::record_outcome(&outcome);

        match self.render(&outcome, channel).await {
            Ok(response) => {
                self.populate(Some((key, response.clone())), None);
                response.into_response()
            }
            Err(e) => asset_failure(&e),
        }
    }

    /// Live lookup: shared cache, then binding store, then asset table.
    ///
    /// Store failures become `Outcome::Failed`; shared cache failures are
    /// treated as a miss.
    #[instrument(skip_all, fields(hash = %hash, channel = %channel))]
    async fn resolve(&self, hash: &TokenHash, channel: Channel) -> Resolution {
        let (poster, bound) = match self.cached_poster(hash).await {
            Some(poster) => (poster, None),
            None => match self.bindings.resolve(hash).await {
                Ok(resolution) => match resolution.poster_id {
                    Some(poster) => {
                        if resolution.created {
                            debug!(poster = %poster, "token bound to new poster");
                        }
                        (poster, Some(poster))
                    }
                    None => return Resolution::new(Outcome::NoPoster),
                },
                Err(e) => {
                    store_failure("binding store", &e);
                    return Resolution::new(Outcome::Failed);
                }
            },
        };

        let outcome = match self.materials.material_url(poster, channel).await {
            Ok(Some(url)) => Outcome::Found(url),
            Ok(None) => Outcome::NoMaterial,
            Err(e) => {
                store_failure("asset table", &e);
                Outcome::Failed
            }
        };
        Resolution { outcome, bound }
    }

    async fn cached_poster(&self, hash: &TokenHash) -> Option<PosterId> {
        match self
            .shared_cache
            .get_if_present(hash, self.config.token_keepalive())
            .await
        {
            Ok(Some(poster)) => {
                metrics::record_shared_cache(SharedCacheAction::Hit);
                Some(poster)
            }
            Ok(None) => {
                metrics::record_shared_cache(SharedCacheAction::NoneFound);
                None
            }
            Err(e) => {
                metrics::record_shared_cache(SharedCacheAction::Error);
                warn!(error = %e, mode = self.shared_cache.mode(), "shared cache read failed");
                None
            }
        }
    }

    async fn cached(&self, key: &RequestKey) -> Option<Response> {
        match self.edge_cache.get(key).await {
            Some(hit) => {
                metrics::record_edge_cache("hit");
                Some(hit.into_response())
            }
            None => {
                metrics::record_edge_cache("miss");
                None
            }
        }
    }

    async fn invalid_channel(&self) -> Response {
        self.uncached(Outcome::InvalidChannel, Channel::default())
            .await
    }

    /// Responds without touching either cache.
    async fn uncached(&self, outcome: Outcome, channel: Channel) -> Response {
        metrics::record_outcome(&outcome);
        match self.render(&outcome, channel).await {
            Ok(response) => response.into_response(),
            Err(e) => asset_failure(&e),
        }
    }

    async fn render(
        &self,
        outcome: &Outcome,
        channel: Channel,
    ) -> Result<CachedResponse, AssetError> {
        if let Outcome::Found(url) = outcome {
            return Ok(CachedResponse::redirect(url.as_str(), self.public_cache_control()));
        }

        let bundle = FallbackChain::select(outcome).unwrap_or(BakedBundle::Error);
        let status = if FallbackChain::is_failure(outcome) {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        };
        let mut response = self.bundle(bundle, channel, status).await?;
        if is_cacheable(outcome) {
            response.cache_control = self.public_cache_control();
        }
        Ok(response)
    }

    async fn bundle(
        &self,
        bundle: BakedBundle,
        channel: Channel,
        status: StatusCode,
    ) -> Result<CachedResponse, AssetError> {
        let asset = self.assets.fetch(bundle.filename(channel)).await?;
        let cache_control = if status.is_server_error() {
            NO_STORE
        } else {
            NO_CACHE
        };
        Ok(CachedResponse::asset(
            status,
            cache_control,
            asset.filename,
            asset.content_type,
            asset.body,
        ))
    }

    fn public_cache_control(&self) -> String {
        format!(
            "public, s-maxage={}",
            self.config.response_cache_max_age_secs
        )
    }

    /// Writes the response cache and shared cache off the response path.
    fn populate(
        &self,
        edge: Option<(RequestKey, CachedResponse)>,
        binding: Option<(TokenHash, PosterId)>,
    ) {
        if edge.is_none() && binding.is_none() {
            return;
        }

        let edge_cache = self.edge_cache.clone();
        let shared_cache = self.shared_cache.clone();
        let max_age = self.config.response_max_age();
        let keepalive = self.config.token_keepalive();

        tokio::spawn(async move {
            if let Some((hash, poster)) = binding {
                match shared_cache.set_if_absent(&hash, poster, keepalive).await {
                    Ok(cached) if cached == poster => {
                        metrics::record_shared_cache(SharedCacheAction::Update);
                    }
                    Ok(cached) => {
                        metrics::record_shared_cache(SharedCacheAction::UpdateDiscarded);
                        debug!(hash = %hash, ours = %poster, cached = %cached, "shared cache already held a poster");
                    }
                    Err(e) => {
                        metrics::record_shared_cache(SharedCacheAction::Error);
                        warn!(hash = %hash, error = %e, "shared cache write failed");
                    }
                }
            }
            if let Some((key, response)) = edge {
                edge_cache.put(key, response, max_age).await;
            }
        });
    }
}

/// Only live lookups that reached a definite answer may be cached.
fn is_cacheable(outcome: &Outcome) -> bool {
    matches!(
        outcome,
        Outcome::Found(_) | Outcome::NoMaterial | Outcome::NoPoster
    )
}

fn store_failure(store: &'static str, e: &StorageError) {
    metrics::record_store_error(e.category());
    error!(store, category = %e.category(), error = %e, "store lookup failed");
}

fn asset_failure(e: &AssetError) -> Response {
    error!(error = %e, "baked poster unavailable");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CACHE_CONTROL, NO_STORE)],
    )
        .into_response()
}

pub async fn redirect_default(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Response {
    state.router.redirect(&token, None).await
}

pub async fn redirect_channel(
    State(state): State<AppState>,
    Path((token, channel)): Path<(String, String)>,
) -> Response {
    state.router.redirect(&token, Some(&channel)).await
}

pub async fn poster_default(
    State(state): State<AppState>,
    Path(poster_id): Path<String>,
) -> Response {
    state.router.poster(&poster_id, None).await
}

pub async fn poster_channel(
    State(state): State<AppState>,
    Path((poster_id, channel)): Path<(String, String)>,
) -> Response {
    state.router.poster(&poster_id, Some(&channel)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheable_outcomes() {
        assert!(is_cacheable(&Outcome::Found("http://x".into())));
        assert!(is_cacheable(&Outcome::NoMaterial));
        assert!(is_cacheable(&Outcome::NoPoster));
        assert!(!is_cacheable(&Outcome::Diagnostic));
        assert!(!is_cacheable(&Outcome::BackendDisabled));
        assert!(!is_cacheable(&Outcome::InvalidChannel));
        assert!(!is_cacheable(&Outcome::Failed));
    }
}

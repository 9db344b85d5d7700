use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{Router, middleware, routing::get};
use imagefork_db_memory::InMemoryStorage;
use imagefork_db_postgres::PostgresStorage;
use imagefork_storage::{DynAssetTable, DynBindingStore};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    assets::{DirectoryAssetStore, DynAssetStore},
    cache::DynSharedCache,
    circuit_breaker::CircuitBreaker,
    config::{AppConfig, StorageBackend},
    error::ServerError,
    handlers,
    middleware as app_middleware,
    redirect::{self, RequestRouter},
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub bindings: DynBindingStore,
    pub breaker: CircuitBreaker,
    pub shared_cache_mode: &'static str,
}

pub struct ImageforkServer {
    addr: SocketAddr,
    app: Router,
    breaker: CircuitBreaker,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .route("/redirect/{token}", get(redirect::redirect_default))
        .route("/redirect/{token}/{channel}", get(redirect::redirect_channel))
        .route("/poster/{poster_id}", get(redirect::poster_default))
        .route("/poster/{poster_id}/{channel}", get(redirect::poster_channel))
        .with_state(state)
        // Request order: body limit -> request id -> trace -> cors -> metrics
        .layer(middleware::from_fn(app_middleware::http_metrics))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let method = req.method().clone();
                    // Path carries raw tokens; log only the route prefix.
                    let route = req
                        .uri()
                        .path()
                        .split('/')
                        .nth(1)
                        .unwrap_or("")
                        .to_string();
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %method,
                        http.route = %route,
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        // Wraps the trace layer so the span sees the request id.
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// Assembles the server from configuration; any component may be supplied
/// up front instead of being built from `AppConfig`.
pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    storage: Option<(DynBindingStore, DynAssetTable)>,
    shared_cache: Option<DynSharedCache>,
    assets: Option<DynAssetStore>,
    breaker: Option<CircuitBreaker>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            storage: None,
            shared_cache: None,
            assets: None,
            breaker: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn with_storage(mut self, bindings: DynBindingStore, materials: DynAssetTable) -> Self {
        self.storage = Some((bindings, materials));
        self
    }

    pub fn with_shared_cache(mut self, cache: DynSharedCache) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    pub fn with_asset_store(mut self, assets: DynAssetStore) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub async fn build(self) -> Result<ImageforkServer, ServerError> {
        let cfg = self.config;
        cfg.validate().map_err(ServerError::Config)?;

        let (bindings, materials) = match self.storage {
            Some(storage) => storage,
            None => create_storage(&cfg).await?,
        };

        let shared_cache = match self.shared_cache {
            Some(cache) => cache,
            None => crate::create_shared_cache(&cfg.redis).await,
        };

        let assets = match self.assets {
            Some(assets) => assets,
            None => {
                if !Path::new(&cfg.assets.dir).is_dir() {
                    tracing::warn!(dir = %cfg.assets.dir, "assets directory not found; baked posters will fail");
                }
                Arc::new(DirectoryAssetStore::new(&cfg.assets.dir)) as DynAssetStore
            }
        };

        let breaker = self
            .breaker
            .unwrap_or_else(|| CircuitBreaker::new(cfg.redirect.no_backend_serve));
        if breaker.is_tripped() {
            tracing::warn!("backend serving disabled; only baked posters will be served");
        }

        let shared_cache_mode = shared_cache.mode();
        let router = RequestRouter::new(
            bindings.clone(),
            materials,
            shared_cache,
            assets,
            breaker.clone(),
            cfg.redirect.clone(),
        );
        let state = AppState {
            router: Arc::new(router),
            bindings,
            breaker: breaker.clone(),
            shared_cache_mode,
        };

        Ok(ImageforkServer {
            addr: self.addr,
            app: build_app(&cfg, state),
            breaker,
        })
    }
}

async fn create_storage(cfg: &AppConfig) -> Result<(DynBindingStore, DynAssetTable), ServerError> {
    match cfg.storage.backend {
        StorageBackend::Postgres => {
            let storage =
                Arc::new(PostgresStorage::new(&cfg.storage.postgres.to_pool_config()).await?);
            tracing::info!("using PostgreSQL storage");
            let bindings: DynBindingStore = storage.clone();
            let materials: DynAssetTable = storage;
            Ok((bindings, materials))
        }
        StorageBackend::Memory => {
            let storage = Arc::new(InMemoryStorage::seeded(&cfg.storage.memory)?);
            tracing::info!(
                posters = cfg.storage.memory.posters.len(),
                "using in-memory storage"
            );
            let bindings: DynBindingStore = storage.clone();
            let materials: DynAssetTable = storage;
            Ok((bindings, materials))
        }
    }
}

impl ImageforkServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle for flipping backend serving at runtime.
    pub fn breaker(&self) -> CircuitBreaker {
        self.breaker.clone()
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

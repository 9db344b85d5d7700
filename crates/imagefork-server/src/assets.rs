//! Asset store holding the baked poster files, keyed by filename.

use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct StaticAsset {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

impl StaticAsset {
    pub fn new(filename: impl Into<String>, body: Bytes) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();
        Self {
            filename,
            content_type,
            body,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("invalid asset name: {0}")]
    InvalidName(String),

    #[error("failed to read asset {filename}: {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn fetch(&self, filename: &str) -> Result<StaticAsset, AssetError>;
}

pub type DynAssetStore = Arc<dyn AssetStore>;

/// Accepts a single plain path component only.
fn validate_name(filename: &str) -> Result<(), AssetError> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !filename.contains('\\') => Ok(()),
        _ => Err(AssetError::InvalidName(filename.to_string())),
    }
}

/// Serves files from a directory, keeping them in memory after the first read.
pub struct DirectoryAssetStore {
    root: PathBuf,
    loaded: DashMap<String, StaticAsset>,
}

impl DirectoryAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AssetStore for DirectoryAssetStore {
    async fn fetch(&self, filename: &str) -> Result<StaticAsset, AssetError> {
        validate_name(filename)?;
        if let Some(asset) = self.loaded.get(filename) {
            return Ok(asset.clone());
        }

        let path = self.root.join(filename);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(filename.to_string()));
            }
            Err(source) => {
                return Err(AssetError::Io {
                    filename: filename.to_string(),
                    source,
                });
            }
        };

        let asset = StaticAsset::new(filename, Bytes::from(body));
        self.loaded.insert(filename.to_string(), asset.clone());
        tracing::debug!(filename, path = %path.display(), "loaded baked asset");
        Ok(asset)
    }
}

/// In-process asset store.
#[derive(Default)]
pub struct MemoryAssetStore {
    files: DashMap<String, Bytes>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, filename: impl Into<String>, body: impl Into<Bytes>) {
        self.files.insert(filename.into(), body.into());
    }

    pub fn with_file(self, filename: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.insert(filename, body);
        self
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn fetch(&self, filename: &str) -> Result<StaticAsset, AssetError> {
        validate_name(filename)?;
        self.files
            .get(filename)
            .map(|body| StaticAsset::new(filename, body.clone()))
            .ok_or_else(|| AssetError::NotFound(filename.to_string()))
    }
}

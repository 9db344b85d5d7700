//! Per-node cache of rendered responses.
//!
//! Entries carry their own TTL; a zero TTL is never stored.

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use imagefork_core::Channel;
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};

/// Which route produced a response.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RouteKind {
    Redirect,
    Poster,
}

/// Cache key: the exact inbound request signature.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct RequestKey {
    pub route: RouteKind,
    /// Raw token or poster id segment as it appeared in the path
    pub subject: String,
    pub channel: Channel,
}

impl RequestKey {
    pub fn redirect(token: impl Into<String>, channel: Channel) -> Self {
        Self {
            route: RouteKind::Redirect,
            subject: token.into(),
            channel,
        }
    }

    pub fn poster(poster_id: impl Into<String>, channel: Channel) -> Self {
        Self {
            route: RouteKind::Poster,
            subject: poster_id.into(),
            channel,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `Location` redirect to a live material
    Redirect { location: String },
    /// Baked asset served inline
    Asset {
        filename: String,
        content_type: String,
        body: Bytes,
    },
}

/// A fully rendered response, cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub cache_control: String,
    pub body: ResponseBody,
}

impl CachedResponse {
    pub fn redirect(location: impl Into<String>, cache_control: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            cache_control: cache_control.into(),
            body: ResponseBody::Redirect {
                location: location.into(),
            },
        }
    }

    pub fn asset(
        status: StatusCode,
        cache_control: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        body: Bytes,
    ) -> Self {
        Self {
            status,
            cache_control: cache_control.into(),
            body: ResponseBody::Asset {
                filename: filename.into(),
                content_type: content_type.into(),
                body,
            },
        }
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        match self.body {
            ResponseBody::Redirect { location } => (
                self.status,
                [
                    (header::LOCATION, location),
                    (header::CACHE_CONTROL, self.cache_control),
                ],
            )
                .into_response(),
            ResponseBody::Asset {
                content_type, body, ..
            } => (
                self.status,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, self.cache_control),
                ],
                body,
            )
                .into_response(),
        }
    }
}

#[derive(Clone)]
struct TimedResponse {
    response: CachedResponse,
    ttl: Duration,
}

struct PerEntryExpiry;

impl Expiry<RequestKey, TimedResponse> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &RequestKey,
        value: &TimedResponse,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded response cache with per-entry expiry.
#[derive(Clone)]
pub struct EdgeResponseCache {
    entries: Cache<RequestKey, TimedResponse>,
}

impl EdgeResponseCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryExpiry)
                .build(),
        }
    }

    pub async fn get(&self, key: &RequestKey) -> Option<CachedResponse> {
        self.entries.get(key).await.map(|timed| timed.response)
    }

    pub async fn put(&self, key: RequestKey, response: CachedResponse, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.entries
            .insert(key, TimedResponse { response, ttl })
            .await;
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(url: &str) -> CachedResponse {
        CachedResponse::redirect(url, "public, s-maxage=60")
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = EdgeResponseCache::new(16);
        let key = RequestKey::redirect("abc", Channel::Albedo);

        assert!(cache.get(&key).await.is_none());
        cache
            .put(key.clone(), found("http://x/a.png"), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get(&key).await, Some(found("http://x/a.png")));

        // Channel and route are part of the key.
        assert!(
            cache
                .get(&RequestKey::redirect("abc", Channel::Normal))
                .await
                .is_none()
        );
        assert!(
            cache
                .get(&RequestKey::poster("abc", Channel::Albedo))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_entries_expire_individually() {
        let cache = EdgeResponseCache::new(16);
        let short = RequestKey::redirect("short", Channel::Albedo);
        let long = RequestKey::redirect("long", Channel::Albedo);

        cache
            .put(short.clone(), found("http://x/1"), Duration::from_millis(50))
            .await;
        cache
            .put(long.clone(), found("http://x/2"), Duration::from_secs(60))
            .await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get(&short).await.is_none());
        assert!(cache.get(&long).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let cache = EdgeResponseCache::new(16);
        let key = RequestKey::redirect("abc", Channel::Albedo);
        cache.put(key.clone(), found("http://x"), Duration::ZERO).await;
        cache.run_pending_tasks().await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_into_response_headers() {
        let response = found("http://x/a.png").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "http://x/a.png");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, s-maxage=60"
        );

        let response = CachedResponse::asset(
            StatusCode::INTERNAL_SERVER_ERROR,
            "no-store",
            "error.webp",
            "image/webp",
            Bytes::from_static(b"RIFF"),
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/webp");
    }
}

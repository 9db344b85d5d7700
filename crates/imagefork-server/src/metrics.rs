//! Prometheus metrics for the redirect service.
//!
//! - HTTP request metrics (count, latency)
//! - Redirect outcomes by kind
//! - Shared token cache and per-node response cache activity
//! - Store failures by category

use imagefork_core::{Channel, Outcome};
use imagefork_storage::ErrorCategory;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    pub const REDIRECT_OUTCOMES_TOTAL: &str = "imagefork_redirect_outcomes_total";
    pub const SHARED_CACHE_TOTAL: &str = "imagefork_shared_cache_total";
    pub const EDGE_CACHE_TOTAL: &str = "imagefork_edge_cache_total";
    pub const STORE_ERRORS_TOTAL: &str = "imagefork_store_errors_total";
}

/// What happened to a token in the shared cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedCacheAction {
    /// Lookup found a poster and refreshed its TTL
    Hit,
    /// Lookup found nothing
    NoneFound,
    /// Our write landed
    Update,
    /// Another node wrote first; our value was dropped
    UpdateDiscarded,
    /// The cache backend failed; treated as a miss
    Error,
}

impl SharedCacheAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::NoneFound => "none_found",
            Self::Update => "update",
            Self::UpdateDiscarded => "update_discarded",
            Self::Error => "error",
        }
    }
}

/// Install the Prometheus recorder.
///
/// Returns `false` if it was already installed or installation failed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// =============================================================================
// HTTP Metrics
// =============================================================================

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status_class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };

    let normalized_path = normalize_path(path);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status" => status.to_string(),
        "status_class" => status_class.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => normalized_path
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Redirect Metrics
// =============================================================================

pub fn record_outcome(outcome: &Outcome) {
    counter!(names::REDIRECT_OUTCOMES_TOTAL, "outcome" => outcome.label()).increment(1);
}

pub fn record_shared_cache(action: SharedCacheAction) {
    counter!(names::SHARED_CACHE_TOTAL, "action" => action.as_str()).increment(1);
}

/// `result` is `hit` or `miss`.
pub fn record_edge_cache(result: &'static str) {
    counter!(names::EDGE_CACHE_TOTAL, "result" => result).increment(1);
}

pub fn record_store_error(category: ErrorCategory) {
    counter!(names::STORE_ERRORS_TOTAL, "category" => category.as_str()).increment(1);
}

// =============================================================================
// Helpers
// =============================================================================

/// Map a request path onto a bounded set of route labels.
///
/// Tokens and poster ids become placeholders, unknown channel codes become
/// `{channel}`, and anything outside the routed paths becomes `other`.
/// `/redirect/abc/a` -> `/redirect/{token}/a`, `/poster/42/zz` -> `/poster/{id}/{channel}`.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let (prefix, placeholder) = match segments.as_slice() {
        [""] => return "/".to_string(),
        [page @ ("healthz" | "readyz" | "metrics")] => return format!("/{page}"),
        ["redirect", _, ..] => ("/redirect", "{token}"),
        ["poster", _, ..] => ("/poster", "{id}"),
        _ => return "other".to_string(),
    };

    match &segments[2..] {
        [] => format!("{prefix}/{placeholder}"),
        [channel] => {
            let channel = match channel.parse::<Channel>() {
                Ok(channel) => channel.as_code(),
                Err(_) => "{channel}",
            };
            format!("{prefix}/{placeholder}/{channel}")
        }
        _ => "other".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/redirect/abc"), "/redirect/{token}");
        assert_eq!(normalize_path("/redirect/abc/e"), "/redirect/{token}/e");
        assert_eq!(normalize_path("/poster/42/n"), "/poster/{id}/n");
        assert_eq!(normalize_path("/healthz"), "/healthz");
        assert_eq!(normalize_path("/metrics"), "/metrics");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_normalize_path_bounds_client_segments() {
        assert_eq!(normalize_path("/redirect/t/junk"), "/redirect/{token}/{channel}");
        assert_eq!(normalize_path("/poster/42/zz"), "/poster/{id}/{channel}");
        assert_eq!(normalize_path("/random1"), "other");
        assert_eq!(normalize_path("/redirect"), "other");
        assert_eq!(normalize_path("/redirect/t/a/extra"), "other");
        assert_eq!(normalize_path("/healthz/extra"), "other");

        let labels: std::collections::HashSet<String> = (0..1000)
            .flat_map(|i| {
                [
                    normalize_path(&format!("/redirect/t/junk{i}")),
                    normalize_path(&format!("/random{i}")),
                ]
            })
            .collect();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_shared_cache_labels() {
        assert_eq!(SharedCacheAction::Hit.as_str(), "hit");
        assert_eq!(SharedCacheAction::NoneFound.as_str(), "none_found");
        assert_eq!(SharedCacheAction::Update.as_str(), "update");
        assert_eq!(SharedCacheAction::UpdateDiscarded.as_str(), "update_discarded");
    }
}

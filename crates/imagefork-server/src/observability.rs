//! Log output for the redirect service.
//!
//! The filter sits behind a reload layer so `[logging] level` can change
//! with a config reload. An explicit `RUST_LOG` pins the filter at startup;
//! later reloads still replace it.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Level used until the configuration has been read.
pub const BOOTSTRAP_LEVEL: &str = "info";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

pub fn init_tracing() {
    init_tracing_with_level(BOOTSTRAP_LEVEL);
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing_with_level(level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        Err(_) => EnvFilter::new(level),
    };

    let (filter_layer, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// Swaps the active filter for `level`.
///
/// Returns `false` when tracing was not initialized or the filter is unchanged.
pub fn apply_logging_level(level: &str) -> bool {
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };
    if current_logging_level().as_deref() == Some(level) {
        return false;
    }
    match handle.modify(|filter| *filter = EnvFilter::new(level)) {
        Ok(()) => {
            tracing::info!(level, "log level changed");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, level, "failed to change log level");
            false
        }
    }
}

/// The active filter directive, if tracing was initialized here.
pub fn current_logging_level() -> Option<String> {
    FILTER_HANDLE
        .get()
        .and_then(|handle| handle.with_current(|filter| filter.to_string()).ok())
}

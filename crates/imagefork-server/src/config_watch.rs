use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use notify::{Event, RecursiveMode, Watcher, recommended_watcher};
use tracing::{error, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{AppConfig, loader};

/// Apply the hot-reloadable parts of a freshly loaded configuration.
///
/// Only the log level and the circuit breaker change at runtime; everything
/// else takes effect on restart, so the reloaded config is not kept.
pub fn apply_reloaded(cfg: &AppConfig, breaker: &CircuitBreaker) {
    crate::observability::apply_logging_level(&cfg.logging.level);
    let was_tripped = breaker.set(cfg.redirect.no_backend_serve);
    if was_tripped != cfg.redirect.no_backend_serve {
        if cfg.redirect.no_backend_serve {
            warn!("backend serving disabled by configuration reload");
        } else {
            info!("backend serving re-enabled by configuration reload");
        }
    }
}

/// Watch a configuration file and reload it on change (500ms debounce).
///
/// A reload that fails to parse or validate is logged and ignored. Returns
/// the watcher thread, or `None` when the file does not exist.
pub fn start_config_watcher(
    path: PathBuf,
    breaker: CircuitBreaker,
) -> Option<std::thread::JoinHandle<()>> {
    if !path.exists() {
        warn!("config file {:?} does not exist; watcher disabled", path);
        return None;
    }

    let handle = std::thread::spawn(move || {
        let start = Instant::now();
        let last_reload = Arc::new(Mutex::new(
            start.checked_sub(Duration::from_secs(1)).unwrap_or(start),
        ));
        let lp = path.clone();
        let lr = last_reload.clone();

        let mut watcher = match recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(_event) => {
                    let mut last = lr.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    let now = Instant::now();
                    if now.duration_since(*last) < Duration::from_millis(500) {
                        return;
                    }
                    *last = now;
                    match loader::load_config(lp.to_str()) {
                        Ok(new_cfg) => {
                            apply_reloaded(&new_cfg, &breaker);
                            info!("configuration reloaded successfully");
                        }
                        Err(e) => {
                            error!("configuration reload failed: {}", e);
                        }
                    }
                }
                Err(e) => error!("watch error: {}", e),
            }
        }) {
            Ok(w) => w,
            Err(e) => {
                error!("failed to start config watcher: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&path, RecursiveMode::NonRecursive) {
            error!("failed to watch config file: {}", e);
            return;
        }

        // Keep the watcher alive
        loop {
            std::thread::park();
        }
    });

    Some(handle)
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Operator switch that stops all backend resolution.
///
/// Cloned handles share one flag; the config watcher flips it on reload.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    tripped: Arc<AtomicBool>,
}

impl CircuitBreaker {
    pub fn new(tripped: bool) -> Self {
        Self {
            tripped: Arc::new(AtomicBool::new(tripped)),
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Relaxed)
    }

    /// Sets the flag, returning the previous value.
    pub fn set(&self, tripped: bool) -> bool {
        self.tripped.swap(tripped, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let breaker = CircuitBreaker::new(false);
        let handle = breaker.clone();
        assert!(!breaker.is_tripped());

        assert!(!handle.set(true));
        assert!(breaker.is_tripped());
        assert!(breaker.set(false));
        assert!(!handle.is_tripped());
    }
}

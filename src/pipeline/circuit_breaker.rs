//! Circuit Breaker pattern implementation.
//!
//! Stops an enrichment run as soon as the platform signals "too many
//! requests". The breaker is shared by every worker of a job and, once
//! tripped, stays open for the rest of the run.

use std::sync::atomic::{AtomicBool, Ordering};

/// Run-scoped rate-limit breaker.
#[derive(Debug, Default)]
pub struct RateLimitBreaker {
    open: AtomicBool,
}

impl RateLimitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether workers should stop claiming new work.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Open the breaker on a rate-limit answer. Returns true only for the
    /// call that opened it.
    pub fn trip(&self) -> bool {
        let tripped = !self.open.swap(true, Ordering::SeqCst);
        if tripped {
            log::warn!("Circuit breaker: TRIPPED by rate limit - workers draining");
        }
        tripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_closed() {
        let cb = RateLimitBreaker::new();
        assert!(!cb.is_open());
    }

    #[test]
    fn test_trips_once() {
        let cb = RateLimitBreaker::new();
        assert!(cb.trip());
        assert!(cb.is_open());
        assert!(!cb.trip());
        assert!(cb.is_open());
    }
}

//! # Circuit Breaker Module
//!
//! Guards the external speech-recognition and language-model calls. When a
//! service fails repeatedly the breaker opens and requests fail fast until
//! the reset window elapses.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Failure-threshold circuit breaker shared by the outbound API clients.
///
/// Closed while failures stay under `circuit_breaker_threshold`; open (fail
/// fast) afterwards, until `circuit_breaker_reset_secs` passes since the
/// last failure. A success closes it immediately.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    /// Whether requests should currently fail fast.
    ///
    /// Resets to closed automatically once the reset window has elapsed.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.failure_count < self.config.circuit_breaker_threshold {
            return false;
        }
        match state.last_failure {
            Some(last)
                if last.elapsed() < Duration::from_secs(self.config.circuit_breaker_reset_secs) =>
            {
                true
            }
            _ => {
                *state = BreakerState::default();
                false
            }
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        state.failure_count += 1;
        state.last_failure = Some(Instant::now());
    }

    pub fn record_success(&self) {
        *self.state.lock().unwrap() = BreakerState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(RecoveryConfig {
            circuit_breaker_threshold: threshold,
            ..Default::default()
        })
    }

    #[test]
    fn opens_after_threshold_failures() {
        let cb = breaker(2);
        assert!(!cb.is_open());
        cb.record_failure();
        assert!(!cb.is_open());
        cb.record_failure();
        assert!(cb.is_open());
    }

    #[test]
    fn success_closes_the_circuit() {
        let cb = breaker(1);
        cb.record_failure();
        assert!(cb.is_open());
        cb.record_success();
        assert!(!cb.is_open());
    }

    #[test]
    fn resets_after_the_window() {
        let cb = CircuitBreaker::new(RecoveryConfig {
            circuit_breaker_threshold: 1,
            circuit_breaker_reset_secs: 0,
            ..Default::default()
        });
        cb.record_failure();
        // Zero-second window: the breaker re-closes on the next check
        assert!(!cb.is_open());
    }
}

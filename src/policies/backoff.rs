//! # Backoff between job retries.
//!
//! The delay before retry `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`, then jittered. The base is derived from the retry number alone, so
//! jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use kernelvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::exponential(Duration::from_secs(1));
//! assert_eq!(backoff.next(0), Duration::from_secs(1));
//! assert_eq!(backoff.next(1), Duration::from_secs(2));
//! assert_eq!(backoff.next(2), Duration::from_secs(4));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = constant).
    pub factor: f64,
    /// Randomization on top of the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant 1s delay, capped at 60s, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Doubling delay starting at `first`.
    pub fn exponential(first: Duration) -> Self {
        Self {
            first,
            factor: 2.0,
            ..Self::default()
        }
    }

    /// Computes the delay before retry `retry` (0-indexed).
    pub fn next(&self, retry: u32) -> Duration {
        let exp = retry.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

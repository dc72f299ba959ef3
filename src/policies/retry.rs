//! # Retry policy attached to enqueued jobs.
//!
//! [`RetryPolicy`] tells the job queue how many times a job may run in total
//! and how long to wait between runs.

use std::time::Duration;

use serde::Serialize;

use crate::policies::{BackoffPolicy, JitterPolicy};

/// Attempts budget plus backoff for one job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total runs allowed, first run included (`0` is treated as `1`).
    pub attempts: u32,
    /// Delay schedule between runs.
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            backoff: BackoffPolicy::default(),
        }
    }

    /// `attempts` runs with doubling delay starting at `first`.
    pub fn exponential(attempts: u32, first: Duration) -> Self {
        Self {
            attempts,
            backoff: BackoffPolicy::exponential(first),
        }
    }

    /// Same policy with `jitter` applied to every delay.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.backoff.jitter = jitter;
        self
    }

    /// Delay before the next run after `failed_runs` failures, or `None` when
    /// the budget is spent.
    pub fn retry_after(&self, failed_runs: u32) -> Option<Duration> {
        if failed_runs >= self.attempts.max(1) {
            return None;
        }
        Some(self.backoff.next(failed_runs.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// Serializable view, as handed to a queue backend.
#[derive(Serialize)]
struct RetryView {
    attempts: u32,
    backoff_ms: u64,
    factor: f64,
}

impl Serialize for RetryPolicy {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        RetryView {
            attempts: self.attempts,
            backoff_ms: self.backoff.first.as_millis().min(u128::from(u64::MAX)) as u64,
            factor: self.backoff.factor,
        }
        .serialize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_job_policy_retries_twice() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1000));
        assert_eq!(policy.retry_after(1), Some(Duration::from_millis(1000)));
        assert_eq!(policy.retry_after(2), Some(Duration::from_millis(2000)));
        assert_eq!(policy.retry_after(3), None);
    }

    #[test]
    fn jittered_delays_stay_within_half() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1000))
            .with_jitter(JitterPolicy::Equal);
        for _ in 0..50 {
            let d = policy.retry_after(2).unwrap();
            assert!(d >= Duration::from_millis(1000) && d <= Duration::from_millis(2000));
        }
    }

    #[test]
    fn once_never_retries() {
        assert_eq!(RetryPolicy::once().retry_after(1), None);
        let zero = RetryPolicy {
            attempts: 0,
            ..RetryPolicy::once()
        };
        assert_eq!(zero.retry_after(1), None);
    }

    #[test]
    fn serializes_backend_view() {
        let v = serde_json::to_value(RetryPolicy::exponential(3, Duration::from_secs(1))).unwrap();
        assert_eq!(v["attempts"], 3);
        assert_eq!(v["backoff_ms"], 1000);
        assert_eq!(v["factor"], 2.0);
    }
}

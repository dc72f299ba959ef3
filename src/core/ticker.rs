//! # Restartable periodic loop.
//!
//! [`Ticker`] drives the two periodic loops of the system (health supervision
//! and queue monitoring). It owns at most one background task at a time.
//!
//! ```text
//! start(period, tick) ──► spawn: loop { select!(cancelled → exit, interval.tick → tick().await) }
//! stop()              ──► token.cancel()
//! ```
//!
//! ## Rules
//! - The first tick fires one full `period` after `start`.
//! - `start` on a running ticker is a no-op and returns `false`.
//! - A tick in progress runs to completion; cancellation is observed between ticks.
//! - Missed ticks are skipped, never bursted.
//! - A panicking tick is logged and the loop keeps going.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::panic_message;

/// Owner of a single periodic background task.
pub struct Ticker {
    name: &'static str,
    slot: Mutex<Option<CancellationToken>>,
}

impl Ticker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
        }
    }

    /// Starts calling `tick` every `period`.
    ///
    /// Returns `false` (and does nothing) if the loop is already running.
    /// Must be called within a tokio runtime.
    pub fn start<F, Fut>(&self, period: Duration, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());

        let name = self.name;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(ticker = name, ?period, "loop started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(panic) = AssertUnwindSafe(tick()).catch_unwind().await {
                            error!(ticker = name, panic = %panic_message(&*panic), "tick panicked");
                        }
                    }
                }
            }
            debug!(ticker = name, "loop stopped");
        });
        true
    }

    /// Cancels the loop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let token = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(ticks: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let ticks = Arc::clone(ticks);
        move || {
            ticks.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_one_period_after_start() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = Ticker::new("test");
        assert!(t.start(Duration::from_secs(10), counting(&ticks)));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_a_noop_and_stop_halts_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = Ticker::new("test");
        assert!(t.start(Duration::from_secs(1), counting(&ticks)));
        assert!(!t.start(Duration::from_secs(1), counting(&ticks)));
        assert!(t.is_running());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        assert!(t.stop());
        assert!(!t.stop());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!t.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_tick_keeps_the_loop_alive() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = Ticker::new("test");
        let seen = Arc::clone(&ticks);
        t.start(Duration::from_secs(1), move || {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    panic!("first tick fails");
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(t.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_a_tick_lets_it_finish() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let t = Ticker::new("test");
        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));
        t.start(Duration::from_secs(10), move || {
            let (s, f) = (Arc::clone(&s), Arc::clone(&f));
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                f.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        assert!(t.stop());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}

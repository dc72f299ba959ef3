//! Job retry policies.
//!
//! ## Contents
//! - [`RetryPolicy`] attempts budget attached to every enqueued job
//! - [`BackoffPolicy`] how delays evolve between attempts (first / factor / max)
//! - [`JitterPolicy`] randomization on top of the delay
//!
//! ## Quick wiring
//! ```text
//! EventBus ──lead.created──► LeadIntake ──enqueue(Job { retry: RetryPolicy })──► JobQueue
//!                                                         └─► backoff.next(n) between runs
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;

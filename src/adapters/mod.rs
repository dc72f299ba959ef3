//! In-memory collaborators.
//!
//! Reference implementations of the [`ports`](crate::ports) traits. They back
//! the test-suite and the demo, and each one can simulate an outage so the
//! failure paths of the kernel can be exercised.

mod cache;
mod queue;
mod store;

pub use cache::MemoryCache;
pub use queue::{FailOutcome, Leased, MemoryQueue};
pub use store::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::PortError;
use crate::policies::RetryPolicy;

/// Job-queue counters as reported by the queue backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounters {
    pub active: u64,
    pub waiting: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounters {
    /// `active + waiting`, the value recorded as `queueLoad`.
    #[inline]
    pub fn load(&self) -> u64 {
        self.active.saturating_add(self.waiting)
    }
}

/// Unit of background work.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Job {
    pub name: String,
    pub payload: Value,
    pub retry: RetryPolicy,
}

impl Job {
    pub fn new(name: impl Into<String>, payload: Value, retry: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            payload,
            retry,
        }
    }
}

/// Job-queue collaborator.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    /// Adds a job and returns the backend's job id.
    async fn enqueue(&self, job: Job) -> Result<u64, PortError>;

    async fn counters(&self) -> Result<QueueCounters, PortError>;

    /// Sets how many jobs the workers may run at once. Re-applying the same value is a no-op;
    /// zero is rejected.
    async fn set_concurrency(&self, n: usize) -> Result<(), PortError>;

    /// Stops intake of new work. Pausing a paused queue is a no-op.
    async fn pause(&self) -> Result<(), PortError>;
}

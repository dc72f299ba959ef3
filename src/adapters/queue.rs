//! In-memory [`JobQueue`].
//!
//! Models the parts of a job broker the kernel observes: waiting / active /
//! completed / failed counters, a worker concurrency limit and a paused flag.
//! Workers pull with [`MemoryQueue::take_next`] and report back with
//! [`MemoryQueue::complete`] or [`MemoryQueue::fail`]; failures are retried
//! according to the job's [`RetryPolicy`](crate::RetryPolicy).
//!
//! ```text
//! enqueue ──► waiting ──take_next──► active ──complete──► completed
//!                ▲                      │
//!                └──── retry budget ◄───┴──fail──► failed (budget spent)
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::PortError;
use crate::ports::{Job, JobQueue, QueueCounters};

/// Job handed to a worker by [`MemoryQueue::take_next`].
#[derive(Clone, Debug)]
pub struct Leased {
    pub id: u64,
    pub job: Job,
    /// 1-based run number of this lease.
    pub run: u32,
}

/// What happened to a failed job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailOutcome {
    /// Job went back to waiting; the broker would hold it for this long.
    Retry(Duration),
    /// Retry budget spent; job counted as failed.
    Exhausted,
}

struct Entry {
    job: Job,
    failed_runs: u32,
}

struct State {
    next_id: u64,
    waiting: VecDeque<u64>,
    active: HashSet<u64>,
    entries: HashMap<u64, Entry>,
    completed: u64,
    failed: u64,
    concurrency: usize,
    paused: bool,
}

/// Process-local job queue.
pub struct MemoryQueue {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    /// Empty queue with concurrency 1, not paused.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 0,
                waiting: VecDeque::new(),
                active: HashSet::new(),
                entries: HashMap::new(),
                completed: 0,
                failed: 0,
                concurrency: 1,
                paused: false,
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every trait call fail (`true`) or succeed again (`false`).
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PortError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PortError::unavailable("queue", "broker unreachable"))
        } else {
            Ok(())
        }
    }

    pub async fn concurrency(&self) -> usize {
        self.state.lock().await.concurrency
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.paused
    }

    /// Lifts a pause.
    pub async fn resume(&self) {
        self.state.lock().await.paused = false;
    }

    /// Moves the oldest waiting job to active.
    ///
    /// Returns `None` while paused, when the concurrency limit is reached, or
    /// when nothing waits.
    pub async fn take_next(&self) -> Option<Leased> {
        let mut st = self.state.lock().await;
        if st.paused || st.active.len() >= st.concurrency {
            return None;
        }
        let id = st.waiting.pop_front()?;
        st.active.insert(id);
        let entry = st.entries.get(&id)?;
        Some(Leased {
            id,
            job: entry.job.clone(),
            run: entry.failed_runs + 1,
        })
    }

    /// Marks an active job as done. Returns `false` if it was not active.
    pub async fn complete(&self, id: u64) -> bool {
        let mut st = self.state.lock().await;
        if !st.active.remove(&id) {
            return false;
        }
        st.entries.remove(&id);
        st.completed += 1;
        true
    }

    /// Reports a failed run. Returns `None` if the job was not active.
    pub async fn fail(&self, id: u64) -> Option<FailOutcome> {
        let mut st = self.state.lock().await;
        if !st.active.remove(&id) {
            return None;
        }

        let retry = {
            let entry = st.entries.get_mut(&id)?;
            entry.failed_runs += 1;
            entry.job.retry.retry_after(entry.failed_runs)
        };
        match retry {
            Some(delay) => {
                st.waiting.push_back(id);
                Some(FailOutcome::Retry(delay))
            }
            None => {
                st.entries.remove(&id);
                st.failed += 1;
                Some(FailOutcome::Exhausted)
            }
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: Job) -> Result<u64, PortError> {
        self.check()?;
        let mut st = self.state.lock().await;
        st.next_id += 1;
        let id = st.next_id;
        st.entries.insert(id, Entry { job, failed_runs: 0 });
        st.waiting.push_back(id);
        Ok(id)
    }

    async fn counters(&self) -> Result<QueueCounters, PortError> {
        self.check()?;
        let st = self.state.lock().await;
        Ok(QueueCounters {
            active: st.active.len() as u64,
            waiting: st.waiting.len() as u64,
            completed: st.completed,
            failed: st.failed,
        })
    }

    async fn set_concurrency(&self, n: usize) -> Result<(), PortError> {
        self.check()?;
        if n == 0 {
            return Err(PortError::Rejected {
                port: "queue",
                reason: "concurrency must be at least 1".into(),
            });
        }
        self.state.lock().await.concurrency = n;
        Ok(())
    }

    async fn pause(&self) -> Result<(), PortError> {
        self.check()?;
        self.state.lock().await.paused = true;
        Ok(())
    }
}

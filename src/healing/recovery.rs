//! # Recovery action catalog.
//!
//! [`RecoveryEngine`] knows a fixed set of named remediation actions. Each one:
//!
//! ```text
//! run(action) ─► effect on a collaborator (queue / cache)
//!             ─► store.insert_recovery_log(action, success, target, execution_ms)
//!             ─► on success: emit system.recovered { target }
//! ```
//!
//! ## Rules
//! - Every invocation writes a log entry, including failed ones (`success = false`).
//! - Actions are idempotent in effect: re-raising concurrency, re-flushing an
//!   empty cache and re-pausing a paused queue change nothing.
//! - Nothing propagates: the outcome is returned as a [`RecoveryReport`].

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::PortError;
use crate::events::{EventBus, EventKind};
use crate::ports::{Cache, JobQueue, RecoveryLogEntry, Store};

/// Target name of the lead-processing job queue.
pub const LEAD_QUEUE: &str = "LeadQueue";
/// Target name of the cache.
pub const CACHE: &str = "RedisCache";

/// Named remediation action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryAction {
    /// Raise worker concurrency on the lead queue.
    ScaleWorkers,
    /// Clear the cache store.
    FlushStaleCache,
    /// Halt intake on the lead queue.
    PauseNonCriticalQueues,
}

impl RecoveryAction {
    pub const ALL: [RecoveryAction; 3] = [
        RecoveryAction::ScaleWorkers,
        RecoveryAction::FlushStaleCache,
        RecoveryAction::PauseNonCriticalQueues,
    ];

    /// Name recorded in recovery logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryAction::ScaleWorkers => "scaleWorkers",
            RecoveryAction::FlushStaleCache => "flushStaleCache",
            RecoveryAction::PauseNonCriticalQueues => "pauseNonCriticalQueues",
        }
    }

    /// System the action restores.
    pub fn target(&self) -> &'static str {
        match self {
            RecoveryAction::ScaleWorkers | RecoveryAction::PauseNonCriticalQueues => LEAD_QUEUE,
            RecoveryAction::FlushStaleCache => CACHE,
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one action invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecoveryReport {
    pub action: RecoveryAction,
    pub target: &'static str,
    pub success: bool,
    pub execution_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Executes recovery actions against the queue and cache collaborators.
pub struct RecoveryEngine {
    queue: Arc<dyn JobQueue>,
    cache: Arc<dyn Cache>,
    store: Arc<dyn Store>,
    bus: EventBus,
    scaled_concurrency: usize,
}

impl RecoveryEngine {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        cache: Arc<dyn Cache>,
        store: Arc<dyn Store>,
        bus: EventBus,
        scaled_concurrency: usize,
    ) -> Self {
        Self {
            queue,
            cache,
            store,
            bus,
            scaled_concurrency,
        }
    }

    /// Raises lead-queue worker concurrency to the configured level.
    pub async fn scale_workers(&self) -> RecoveryReport {
        self.run(RecoveryAction::ScaleWorkers).await
    }

    /// Drops every cache key.
    pub async fn flush_stale_cache(&self) -> RecoveryReport {
        self.run(RecoveryAction::FlushStaleCache).await
    }

    /// Stops intake on the lead queue.
    pub async fn pause_non_critical_queues(&self) -> RecoveryReport {
        self.run(RecoveryAction::PauseNonCriticalQueues).await
    }

    /// Executes `action`, logs it and announces a successful recovery.
    pub async fn run(&self, action: RecoveryAction) -> RecoveryReport {
        info!(%action, system = action.target(), "executing recovery action");
        let started = Instant::now();
        let result = self.apply(action).await;
        let execution_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = RecoveryReport {
            action,
            target: action.target(),
            success: result.is_ok(),
            execution_ms,
            error: result.err().map(|e| e.to_string()),
        };

        let entry = RecoveryLogEntry {
            action_taken: action.as_str().to_string(),
            success: report.success,
            target_system: report.target.to_string(),
            execution_ms,
            error: report.error.clone(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.insert_recovery_log(entry).await {
            warn!(%action, label = err.as_label(), error = %err, "failed to write recovery log");
        }

        match &report.error {
            None => {
                info!(%action, execution_ms, "recovery action succeeded");
                self.bus.emit(EventKind::SystemRecovered {
                    target: report.target.into(),
                });
            }
            Some(error) => {
                warn!(%action, %error, "recovery action failed");
            }
        }
        report
    }

    async fn apply(&self, action: RecoveryAction) -> Result<(), PortError> {
        match action {
            RecoveryAction::ScaleWorkers => self.queue.set_concurrency(self.scaled_concurrency).await,
            RecoveryAction::FlushStaleCache => self.cache.flush_all().await,
            RecoveryAction::PauseNonCriticalQueues => self.queue.pause().await,
        }
    }
}

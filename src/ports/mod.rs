//! Collaborator contracts.
//!
//! The kernel never talks to a database, a queue broker or a cache directly;
//! it goes through these traits so the backends stay swappable and the core
//! is testable against the in-memory [`adapters`](crate::adapters).
//!
//! ```text
//! HealthSupervisor ──upsert_service_status──► Store
//! QueueMonitor ──counters──► JobQueue      ──insert_metric──► Store
//! AnomalyPredictor ──recent_metrics / insert_insight──► Store
//! AutonomousRuleEngine ──insert_alert──► Store
//! RecoveryEngine ──set_concurrency / pause──► JobQueue
//!                ──flush_all──► Cache
//!                ──insert_recovery_log──► Store
//! EventGateway ──insert_kernel_event──► Store
//! ```

mod cache;
mod queue;
mod records;
mod store;

pub use cache::Cache;
pub use queue::{Job, JobQueue, QueueCounters};
pub use records::{
    HealthRecord, KernelEventRecord, MetricSample, PredictiveInsight, RecoveryLogEntry,
    RiskLevel, Severity, SystemAlert,
};
pub use store::Store;

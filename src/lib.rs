//! # kernelvisor
//!
//! **Kernelvisor** is an event-driven micro-kernel for async Rust services.
//!
//! It hosts pluggable [`KernelService`]s behind a uniform lifecycle, polls
//! their health into a persistent [`Store`], fans typed events out over an
//! in-process [`EventBus`] and closes the loop with a rule-based
//! [`SelfHealingService`] that detects queue-load anomalies and runs recovery
//! actions on its own.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐
//!     │KernelService │   │KernelService │   │  SelfHealingService  │
//!     │  (plugin #1) │   │  (plugin #2) │   │ monitor/rules/recov. │
//!     └──────┬───────┘   └──────┬───────┘   └──────────┬───────────┘
//!            ▼                  ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Kernel (composition root)                                        │
//! │  - ServiceRegistry   (insertion-ordered, isolated start/stop)     │
//! │  - HealthSupervisor  (periodic health → store.upsert_health)      │
//! │  - EventGateway      (kernel.* → store.insert_kernel_event)       │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        │ publishes        │ publishes        │ publishes     │
//!        │ kernel.booting   │ service_started  │ queue.stalled │
//!        │ kernel.online    │ service_offline  │ sys.recovered │
//!        ▼                  ▼                  ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 EventBus (topic patterns, fire-and-forget)        │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                   ┌───────────────┼───────────────┐
//!                   ▼               ▼               ▼
//!              LeadIntake      LoginAudit       LogWriter
//!             (job queue)      (info! log)    (feature=logging)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Kernel::boot()
//!   ├─► gateway.start()                 (replicate kernel.* events)
//!   ├─► emit kernel.booting
//!   ├─► registry.start_all()            (init → start, failures isolated)
//!   ├─► supervisor.start_monitoring()   (every health_interval)
//!   └─► emit kernel.online
//!
//! Kernel::shutdown()
//!   ├─► emit kernel.shutting_down
//!   ├─► supervisor.stop_monitoring()
//!   ├─► registry.stop_all()             (errors logged, never propagated)
//!   ├─► emit kernel.halted
//!   └─► gateway.stop()
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Services**      | Plugin contract with init/start/stop/health.                  | [`KernelService`], [`HealthReport`]         |
//! | **Kernel**        | Boot/shutdown sequencing, topology snapshot.                  | [`Kernel`], [`KernelBuilder`]               |
//! | **Events**        | Typed events, topic patterns, async listeners.                | [`EventBus`], [`Event`], [`Listener`]       |
//! | **Self-healing**  | Queue monitor, anomaly predictor, rule engine, recoveries.    | [`SelfHealingService`], [`RecoveryEngine`]  |
//! | **Ports**         | Storage, queue and cache contracts with in-memory adapters.   | [`Store`], [`JobQueue`], [`Cache`]          |
//! | **Policies**      | Retry/backoff with jitter for queued jobs.                    | [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **Errors**        | Typed errors for kernel, services, ports and listeners.       | [`KernelError`], [`ServiceError`]           |
//! | **Configuration** | Defaults, TOML and environment overrides.                     | [`KernelConfig`], [`HealingConfig`]         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] listener _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use kernelvisor::{
//!     Event, EventKind, HealingConfig, Kernel, KernelConfig, LeadPayload, MemoryCache,
//!     MemoryQueue, SelfHealingService, install_domain_listeners,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let kernel = Kernel::builder(KernelConfig::default()).build();
//!
//!     let queue = Arc::new(MemoryQueue::new());
//!     install_domain_listeners(kernel.bus(), queue.clone());
//!
//!     let healing = SelfHealingService::new(
//!         HealingConfig::default(),
//!         kernel.store().clone(),
//!         queue.clone(),
//!         Arc::new(MemoryCache::new()),
//!         kernel.bus().clone(),
//!     );
//!     kernel.register(healing).await?;
//!
//!     let summary = kernel.boot().await?;
//!     assert_eq!(summary.started, ["self-healing"]);
//!
//!     let lead = LeadPayload::new("ada@example.com", "Ada");
//!     kernel.bus().publish(Event::new(EventKind::LeadCreated(lead)));
//!
//!     kernel.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod adapters;
mod config;
mod core;
mod error;
mod events;
mod healing;
mod listeners;
mod policies;
mod ports;
pub mod telemetry;

// ---- Public re-exports ----

pub use adapters::{FailOutcome, Leased, MemoryCache, MemoryQueue, MemoryStore};
pub use config::{HealingConfig, KernelConfig, NodeRole};
pub use core::{
    CycleReport, EventGateway, HealthReport, HealthStatus, HealthSupervisor, Kernel,
    KernelBuilder, KernelService, ServiceRef, ServiceRegistry, ServiceState, ServiceView,
    StartSummary, TopologyReport,
};
pub use error::{ConfigError, HandlerError, KernelError, PortError, ServiceError};
pub use events::{
    Event, EventBus, EventKind, KernelEvent, LeadPayload, Listener, ListenerFn, ListenerRef,
    SubscriptionId, Topic,
};
pub use healing::{
    AnomalyPredictor, AutonomousRuleEngine, CACHE, LEAD_QUEUE, QUEUE_LOAD_METRIC, QueueMonitor,
    QueueReading, RULE_ENGINE_SOURCE, RecoveryAction, RecoveryEngine, RecoveryReport,
    RiskAssessment, RuleOutcome, SELF_HEALING, SelfHealingService, SystemReport, SystemRisk,
};
pub use listeners::{LeadIntake, LoginAudit, PROCESS_NEW_LEAD, install_domain_listeners};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use ports::{
    Cache, HealthRecord, Job, JobQueue, KernelEventRecord, MetricSample, PredictiveInsight,
    QueueCounters, RecoveryLogEntry, RiskLevel, Severity, Store, SystemAlert,
};

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;

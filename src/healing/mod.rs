//! Self-healing: detect queue anomalies and remediate them autonomously.
//!
//! ## Flow
//! ```text
//! QueueMonitor ──queueLoad──► Store
//!      └─ waiting > threshold ─► bus: queue.stalled
//!                                   └─► AutonomousRuleEngine.evaluate_queue_rule(waiting)
//!                                          ├─► AnomalyPredictor.evaluate_risk ──► Store (insight)
//!                                          └─ HIGH_RISK & armed ─► Store (alert)
//!                                                                └─► RecoveryEngine.scale_workers
//!                                                                       ├─► JobQueue / Cache
//!                                                                       ├─► Store (recovery log)
//!                                                                       └─► bus: system.recovered
//! ```
//!
//! [`SelfHealingService`] hosts the whole chain as a [`KernelService`](crate::KernelService).

mod monitor;
mod predictor;
mod recovery;
mod report;
mod rules;
mod service;

pub use monitor::{QUEUE_LOAD_METRIC, QueueMonitor, QueueReading};
pub use predictor::{AnomalyPredictor, RiskAssessment};
pub use recovery::{CACHE, LEAD_QUEUE, RecoveryAction, RecoveryEngine, RecoveryReport};
pub use report::{SystemReport, SystemRisk};
pub use rules::{AutonomousRuleEngine, RULE_ENGINE_SOURCE, RuleOutcome};
pub use service::{SELF_HEALING, SelfHealingService};

//! # Autonomous queue rule.
//!
//! [`AutonomousRuleEngine`] turns a queue-load anomaly into a recovery action,
//! at most once per cooldown window per action.
//!
//! ## State machine (per action)
//! ```text
//!             trigger (alert + action)
//!   armed ─────────────────────────────► cooling-down
//!     ▲                                       │
//!     └────────── cooldown elapsed ───────────┘
//! ```
//!
//! ## `evaluate_queue_rule(load)`
//! ```text
//! predictor.evaluate_risk("queueLoad", load)
//!   ├─ Err        → PredictorUnavailable
//!   ├─ SAFE       → Safe
//!   └─ HIGH_RISK  ├─ scaleWorkers cooling down → CoolingDown
//!                 └─ armed → insert CRITICAL alert → scale_workers() → stamp cooldown → Triggered
//! ```
//!
//! ## Rules
//! - The cooldown is stamped whatever the action's outcome.
//! - Cooldowns live in memory only and reset on restart.
//! - Check-then-stamp is not atomic across concurrent callers; the kernel runs
//!   a single rule engine per deployment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::ports::{Severity, Store, SystemAlert};

use super::monitor::QUEUE_LOAD_METRIC;
use super::predictor::{AnomalyPredictor, RiskAssessment};
use super::recovery::{RecoveryAction, RecoveryEngine, RecoveryReport};

/// Source recorded on alerts raised by the rule engine.
pub const RULE_ENGINE_SOURCE: &str = "AutonomousRuleEngine";

/// Result of one rule evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleOutcome {
    /// Load is within bounds; nothing done.
    Safe(RiskAssessment),
    /// Anomaly detected but the action fired less than a cooldown ago.
    CoolingDown { action: RecoveryAction, remaining: Duration },
    /// Alert raised and action executed.
    Triggered {
        alert_id: Option<u64>,
        report: RecoveryReport,
    },
    /// Risk could not be evaluated; nothing done.
    PredictorUnavailable,
}

impl RuleOutcome {
    #[inline]
    pub fn is_triggered(&self) -> bool {
        matches!(self, RuleOutcome::Triggered { .. })
    }
}

/// Cooldown-guarded rule engine.
pub struct AutonomousRuleEngine {
    predictor: AnomalyPredictor,
    recovery: Arc<RecoveryEngine>,
    store: Arc<dyn Store>,
    cooldown: Duration,
    last_fired: Mutex<HashMap<RecoveryAction, Instant>>,
}

impl AutonomousRuleEngine {
    pub fn new(
        predictor: AnomalyPredictor,
        recovery: Arc<RecoveryEngine>,
        store: Arc<dyn Store>,
        cooldown: Duration,
    ) -> Self {
        Self {
            predictor,
            recovery,
            store,
            cooldown,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluates the queue-load rule for `current_load`.
    pub async fn evaluate_queue_rule(&self, current_load: f64) -> RuleOutcome {
        let risk = match self.predictor.evaluate_risk(QUEUE_LOAD_METRIC, current_load).await {
            Ok(risk) => risk,
            Err(err) => {
                warn!(label = err.as_label(), error = %err, "risk evaluation failed");
                return RuleOutcome::PredictorUnavailable;
            }
        };
        if !risk.is_high_risk() {
            return RuleOutcome::Safe(risk);
        }

        let action = RecoveryAction::ScaleWorkers;
        if let Some(remaining) = self.cooldown_remaining(action).await {
            info!(%action, ?remaining, "action on cooldown, skipping");
            return RuleOutcome::CoolingDown { action, remaining };
        }

        warn!(load = current_load, reason = %risk.reason, "high-risk queue pattern, triggering recovery");
        let alert = SystemAlert::new(
            Severity::Critical,
            RULE_ENGINE_SOURCE,
            format!(
                "Queue load spike detected. Deploying {action} protocol. Reason: {}",
                risk.reason
            ),
        );
        let alert_id = match self.store.insert_alert(alert).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(label = err.as_label(), error = %err, "failed to persist alert");
                None
            }
        };

        let report = self.recovery.run(action).await;
        self.last_fired.lock().await.insert(action, Instant::now());

        RuleOutcome::Triggered { alert_id, report }
    }

    /// Time left before `action` may fire again, `None` if it is armed.
    pub async fn cooldown_remaining(&self, action: RecoveryAction) -> Option<Duration> {
        let last = *self.last_fired.lock().await.get(&action)?;
        let elapsed = last.elapsed();
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }
}

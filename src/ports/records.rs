//! Records exchanged with the persistence collaborator.
//!
//! All records are `Serialize` so read endpoints can project them as JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::core::HealthStatus;

/// Latest known health of one service; upserted by service name every cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthRecord {
    pub service_name: String,
    pub status: HealthStatus,
    /// Kernel uptime when the check completed, in seconds.
    pub uptime_secs: f64,
    pub region: String,
    pub updated_at: DateTime<Utc>,
}

/// One timestamped numeric observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricSample {
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    pub recorded_at: DateTime<Utc>,
}

impl MetricSample {
    /// Sample stamped with the current time.
    pub fn now(metric_name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            value,
            unit: unit.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Risk classification produced by the anomaly predictor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Safe,
    HighRisk,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::HighRisk => "HIGH_RISK",
        })
    }
}

/// Persisted output of a HIGH_RISK classification.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictiveInsight {
    pub risk_level: RiskLevel,
    pub reason: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Alert raised by the rule engine. `id` is assigned by the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemAlert {
    pub id: u64,
    pub severity: Severity,
    pub trigger_source: String,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

impl SystemAlert {
    /// Unacknowledged alert stamped with the current time.
    pub fn new(severity: Severity, trigger_source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            severity,
            trigger_source: trigger_source.into(),
            message: message.into(),
            acknowledged: false,
            created_at: Utc::now(),
        }
    }
}

/// Audit entry, one per recovery-action invocation, written whatever the outcome.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecoveryLogEntry {
    pub action_taken: String,
    pub success: bool,
    pub target_system: String,
    pub execution_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Kernel event replicated by the event gateway.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KernelEventRecord {
    pub event_type: String,
    pub payload: Value,
    pub region: String,
    pub created_at: DateTime<Utc>,
}

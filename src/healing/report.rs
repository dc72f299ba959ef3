//! # Self-healing status projection.
//!
//! [`SystemReport`] is the read model behind a metrics endpoint: it only reads
//! the store and never mutates anything.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PortError;
use crate::ports::{PredictiveInsight, RecoveryLogEntry, Store, SystemAlert};

const RECENT_RECOVERIES: usize = 5;
const LATEST_INSIGHTS: usize = 3;

/// Coarse system risk derived from open alerts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemRisk {
    /// No unacknowledged alert.
    Stable,
    /// At least one unacknowledged alert.
    Critical,
}

/// Snapshot of alerts, recoveries and insights.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemReport {
    pub risk: SystemRisk,
    pub active_alerts: Vec<SystemAlert>,
    /// Newest first.
    pub recovery_actions: Vec<RecoveryLogEntry>,
    /// Newest first.
    pub insights: Vec<PredictiveInsight>,
    /// Time of the most recent recovery action, if any.
    pub last_incident_at: Option<DateTime<Utc>>,
}

impl SystemReport {
    /// Reads the current state from `store`.
    pub async fn collect(store: &dyn Store) -> Result<Self, PortError> {
        let active_alerts = store.active_alerts().await?;
        let recovery_actions = store.recent_recovery_logs(RECENT_RECOVERIES).await?;
        let insights = store.latest_insights(LATEST_INSIGHTS).await?;

        let risk = if active_alerts.is_empty() {
            SystemRisk::Stable
        } else {
            SystemRisk::Critical
        };
        let last_incident_at = recovery_actions.first().map(|e| e.created_at);

        Ok(Self {
            risk,
            active_alerts,
            recovery_actions,
            insights,
            last_incident_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::ports::{RiskLevel, Severity};

    fn log(action: &str) -> RecoveryLogEntry {
        RecoveryLogEntry {
            action_taken: action.to_string(),
            success: true,
            target_system: "LeadQueue".to_string(),
            execution_ms: 3,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_store_is_stable() {
        let store = MemoryStore::new();
        let report = SystemReport::collect(&store).await.unwrap();
        assert_eq!(report.risk, SystemRisk::Stable);
        assert!(report.last_incident_at.is_none());
        assert_eq!(serde_json::to_value(&report).unwrap()["risk"], "STABLE");
    }

    #[tokio::test]
    async fn open_alert_is_critical_until_acknowledged() {
        let store = MemoryStore::new();
        let id = store
            .insert_alert(SystemAlert::new(Severity::Critical, "AutonomousRuleEngine", "spike"))
            .await
            .unwrap();
        assert_eq!(
            SystemReport::collect(&store).await.unwrap().risk,
            SystemRisk::Critical
        );

        assert!(store.acknowledge_alert(id).await.unwrap());
        let report = SystemReport::collect(&store).await.unwrap();
        assert_eq!(report.risk, SystemRisk::Stable);
        assert!(report.active_alerts.is_empty());
    }

    #[tokio::test]
    async fn recent_history_is_capped() {
        let store = MemoryStore::new();
        for i in 0..7 {
            store.insert_recovery_log(log(&format!("action-{i}"))).await.unwrap();
            store
                .insert_insight(PredictiveInsight {
                    risk_level: RiskLevel::HighRisk,
                    reason: format!("surge {i}"),
                    confidence: 0.95,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let report = SystemReport::collect(&store).await.unwrap();
        assert_eq!(report.recovery_actions.len(), 5);
        assert_eq!(report.recovery_actions[0].action_taken, "action-6");
        assert_eq!(report.insights.len(), 3);
        assert_eq!(
            report.last_incident_at,
            Some(report.recovery_actions[0].created_at)
        );
    }
}

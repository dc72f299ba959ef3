//! # Surge detection over recent metric history.
//!
//! [`AnomalyPredictor`] compares a current value against the arithmetic mean of
//! the most recent samples of the same metric:
//!
//! ```text
//! samples = store.recent_metrics(metric, history_window)
//! samples.len() < min_history         → SAFE  "insufficient history"
//! current > surge_multiplier × mean   → HIGH_RISK, persist PredictiveInsight
//! otherwise                           → SAFE  "Within normal operational bounds"
//! ```
//!
//! The detector is deterministic: the same history and current value always
//! give the same classification.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::HealingConfig;
use crate::error::PortError;
use crate::ports::{PredictiveInsight, RiskLevel, Store};

/// Classification returned by [`AnomalyPredictor::evaluate_risk`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub reason: String,
}

impl RiskAssessment {
    fn safe(reason: impl Into<String>) -> Self {
        Self {
            risk_level: RiskLevel::Safe,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn is_high_risk(&self) -> bool {
        self.risk_level == RiskLevel::HighRisk
    }
}

/// Multiplicative-threshold anomaly detector.
pub struct AnomalyPredictor {
    store: Arc<dyn Store>,
    history_window: usize,
    min_history: usize,
    surge_multiplier: f64,
    confidence: f64,
}

impl AnomalyPredictor {
    pub fn new(store: Arc<dyn Store>, cfg: &HealingConfig) -> Self {
        Self {
            store,
            history_window: cfg.history_window,
            min_history: cfg.min_history,
            surge_multiplier: cfg.surge_multiplier,
            confidence: cfg.insight_confidence,
        }
    }

    /// Classifies `current` against the recent history of `metric`.
    ///
    /// Fails only if the history cannot be read. A HIGH_RISK result whose
    /// insight could not be persisted is still returned.
    pub async fn evaluate_risk(
        &self,
        metric: &str,
        current: f64,
    ) -> Result<RiskAssessment, PortError> {
        let samples = self.store.recent_metrics(metric, self.history_window).await?;
        if samples.is_empty() || samples.len() < self.min_history {
            return Ok(RiskAssessment::safe("insufficient history"));
        }

        let mean = samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64;
        if current <= self.surge_multiplier * mean {
            return Ok(RiskAssessment::safe("Within normal operational bounds"));
        }

        let surge_pct = (self.surge_multiplier * 100.0).round();
        let insight = PredictiveInsight {
            risk_level: RiskLevel::HighRisk,
            reason: format!("{metric} surging {surge_pct}% over historical average"),
            confidence: self.confidence,
            created_at: Utc::now(),
        };
        info!(metric, current, mean, "surge anomaly detected");
        if let Err(err) = self.store.insert_insight(insight).await {
            warn!(metric, label = err.as_label(), error = %err, "failed to persist insight");
        }

        Ok(RiskAssessment {
            risk_level: RiskLevel::HighRisk,
            reason: "Surge anomaly detected".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::ports::MetricSample;

    async fn seeded(values: &[f64]) -> (AnomalyPredictor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for v in values {
            store
                .insert_metric(MetricSample::now("queueLoad", *v, "jobs"))
                .await
                .unwrap();
        }
        let predictor = AnomalyPredictor::new(store.clone(), &HealingConfig::default());
        (predictor, store)
    }

    #[tokio::test]
    async fn surge_over_five_times_the_mean_is_high_risk() {
        let (p, store) = seeded(&[10.0; 5]).await;

        let risk = p.evaluate_risk("queueLoad", 60.0).await.unwrap();
        assert!(risk.is_high_risk());
        assert_eq!(risk.reason, "Surge anomaly detected");

        let insights = store.insights().await;
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].risk_level, RiskLevel::HighRisk);
        assert_eq!(insights[0].confidence, 0.95);
        assert_eq!(
            insights[0].reason,
            "queueLoad surging 500% over historical average"
        );
    }

    #[tokio::test]
    async fn value_within_bounds_is_safe() {
        let (p, store) = seeded(&[10.0; 5]).await;
        let risk = p.evaluate_risk("queueLoad", 40.0).await.unwrap();
        assert_eq!(risk.risk_level, RiskLevel::Safe);
        // Exactly 5x the mean is not a surge.
        assert!(!p.evaluate_risk("queueLoad", 50.0).await.unwrap().is_high_risk());
        assert!(store.insights().await.is_empty());
    }

    #[tokio::test]
    async fn cold_start_is_always_safe() {
        let (p, store) = seeded(&[1.0; 4]).await;
        let risk = p.evaluate_risk("queueLoad", 1_000_000.0).await.unwrap();
        assert_eq!(risk.risk_level, RiskLevel::Safe);
        assert_eq!(risk.reason, "insufficient history");
        assert!(store.insights().await.is_empty());
    }

    #[tokio::test]
    async fn only_the_recent_window_counts() {
        let mut history = vec![1000.0; 10];
        history.extend([10.0; 20]);
        let (p, _) = seeded(&history).await;
        assert!(p.evaluate_risk("queueLoad", 60.0).await.unwrap().is_high_risk());
    }

    #[tokio::test]
    async fn other_metrics_are_ignored() {
        let (p, _) = seeded(&[10.0; 5]).await;
        let risk = p.evaluate_risk("cpuLoad", 60.0).await.unwrap();
        assert_eq!(risk.reason, "insufficient history");
    }

    #[tokio::test]
    async fn unreadable_history_is_an_error() {
        let (p, store) = seeded(&[10.0; 5]).await;
        store.set_unavailable(true);
        assert!(p.evaluate_risk("queueLoad", 60.0).await.is_err());
    }
}

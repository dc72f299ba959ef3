//! In-memory [`Store`].
//!
//! Keeps every record in process memory. Useful for tests, demos and
//! single-node setups where losing history on restart is acceptable.
//! [`MemoryStore::set_unavailable`] simulates an outage: every call fails
//! with [`PortError::Unavailable`] until it is cleared.
//!
//! Metric samples and replicated kernel events are append-only; each table
//! keeps at most [`MemoryStore::retention`] entries and drops the oldest.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::PortError;
use crate::ports::{
    HealthRecord, KernelEventRecord, MetricSample, PredictiveInsight, RecoveryLogEntry, Store,
    SystemAlert,
};

/// Default cap on metric samples and kernel events.
const DEFAULT_RETENTION: usize = 10_000;

#[derive(Default)]
struct Tables {
    statuses: HashMap<String, HealthRecord>,
    metrics: VecDeque<MetricSample>,
    insights: Vec<PredictiveInsight>,
    alerts: Vec<SystemAlert>,
    recovery: Vec<RecoveryLogEntry>,
    kernel_events: VecDeque<KernelEventRecord>,
    next_alert_id: u64,
}

fn push_capped<T>(table: &mut VecDeque<T>, item: T, cap: usize) {
    if table.len() >= cap {
        table.pop_front();
    }
    table.push_back(item);
}

/// Process-local store.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    retention: usize,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `retention` metric samples and kernel events (min 1).
    pub fn with_retention(retention: usize) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            retention: retention.max(1),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Makes every subsequent call fail (`true`) or succeed again (`false`).
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PortError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PortError::unavailable("store", "connection refused"))
        } else {
            Ok(())
        }
    }

    /// All metric samples in insertion order.
    pub async fn metrics(&self) -> Vec<MetricSample> {
        self.tables.read().await.metrics.iter().cloned().collect()
    }

    /// All insights in insertion order.
    pub async fn insights(&self) -> Vec<PredictiveInsight> {
        self.tables.read().await.insights.clone()
    }

    /// All alerts (acknowledged included) in insertion order.
    pub async fn alerts(&self) -> Vec<SystemAlert> {
        self.tables.read().await.alerts.clone()
    }

    /// All recovery log entries in insertion order.
    pub async fn recovery_logs(&self) -> Vec<RecoveryLogEntry> {
        self.tables.read().await.recovery.clone()
    }

    /// All replicated kernel events in insertion order.
    pub async fn kernel_events(&self) -> Vec<KernelEventRecord> {
        self.tables.read().await.kernel_events.iter().cloned().collect()
    }

    /// Health record of one service, if any.
    pub async fn status_of(&self, service: &str) -> Option<HealthRecord> {
        self.tables.read().await.statuses.get(service).cloned()
    }
}

/// Last `limit` items of `items`, newest first.
fn newest_first<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().rev().take(limit).cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_service_status(&self, record: HealthRecord) -> Result<(), PortError> {
        self.check()?;
        let mut t = self.tables.write().await;
        t.statuses.insert(record.service_name.clone(), record);
        Ok(())
    }

    async fn service_statuses(&self) -> Result<Vec<HealthRecord>, PortError> {
        self.check()?;
        let t = self.tables.read().await;
        let mut all: Vec<HealthRecord> = t.statuses.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }

    async fn insert_metric(&self, sample: MetricSample) -> Result<(), PortError> {
        self.check()?;
        push_capped(&mut self.tables.write().await.metrics, sample, self.retention);
        Ok(())
    }

    async fn recent_metrics(
        &self,
        metric_name: &str,
        limit: usize,
    ) -> Result<Vec<MetricSample>, PortError> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.metrics
            .iter()
            .rev()
            .filter(|s| s.metric_name == metric_name)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_insight(&self, insight: PredictiveInsight) -> Result<(), PortError> {
        self.check()?;
        self.tables.write().await.insights.push(insight);
        Ok(())
    }

    async fn latest_insights(&self, limit: usize) -> Result<Vec<PredictiveInsight>, PortError> {
        self.check()?;
        Ok(newest_first(&self.tables.read().await.insights, limit))
    }

    async fn insert_alert(&self, mut alert: SystemAlert) -> Result<u64, PortError> {
        self.check()?;
        let mut t = self.tables.write().await;
        t.next_alert_id += 1;
        alert.id = t.next_alert_id;
        t.alerts.push(alert);
        Ok(t.next_alert_id)
    }

    async fn active_alerts(&self) -> Result<Vec<SystemAlert>, PortError> {
        self.check()?;
        let t = self.tables.read().await;
        Ok(t.alerts.iter().rev().filter(|a| !a.acknowledged).cloned().collect())
    }

    async fn acknowledge_alert(&self, id: u64) -> Result<bool, PortError> {
        self.check()?;
        let mut t = self.tables.write().await;
        match t.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_recovery_log(&self, entry: RecoveryLogEntry) -> Result<(), PortError> {
        self.check()?;
        self.tables.write().await.recovery.push(entry);
        Ok(())
    }

    async fn recent_recovery_logs(
        &self,
        limit: usize,
    ) -> Result<Vec<RecoveryLogEntry>, PortError> {
        self.check()?;
        Ok(newest_first(&self.tables.read().await.recovery, limit))
    }

    async fn insert_kernel_event(&self, record: KernelEventRecord) -> Result<(), PortError> {
        self.check()?;
        push_capped(&mut self.tables.write().await.kernel_events, record, self.retention);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Severity;

    #[tokio::test]
    async fn recent_metrics_are_filtered_and_newest_first() {
        let store = MemoryStore::new();
        for v in 1..=30 {
            store.insert_metric(MetricSample::now("queueLoad", v as f64, "jobs")).await.unwrap();
            store.insert_metric(MetricSample::now("latency", 0.5, "s")).await.unwrap();
        }

        let recent = store.recent_metrics("queueLoad", 20).await.unwrap();
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].value, 30.0);
        assert_eq!(recent[19].value, 11.0);
        assert!(recent.iter().all(|s| s.metric_name == "queueLoad"));
    }

    #[tokio::test]
    async fn metric_history_is_bounded() {
        let store = MemoryStore::with_retention(25);
        for v in 1..=40 {
            store.insert_metric(MetricSample::now("queueLoad", v as f64, "jobs")).await.unwrap();
        }
        let all = store.metrics().await;
        assert_eq!(all.len(), 25);
        assert_eq!(all[0].value, 16.0);

        let recent = store.recent_metrics("queueLoad", 20).await.unwrap();
        assert_eq!(recent[0].value, 40.0);
        assert_eq!(recent.len(), 20);
    }

    #[tokio::test]
    async fn alerts_get_ids_and_can_be_acknowledged() {
        let store = MemoryStore::new();
        let a = store.insert_alert(SystemAlert::new(Severity::Critical, "test", "one")).await.unwrap();
        let b = store.insert_alert(SystemAlert::new(Severity::Warning, "test", "two")).await.unwrap();
        assert_ne!(a, b);

        assert!(store.acknowledge_alert(a).await.unwrap());
        assert!(!store.acknowledge_alert(999).await.unwrap());

        let active = store.active_alerts().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b);
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.insert_metric(MetricSample::now("queueLoad", 1.0, "jobs")).await.unwrap_err();
        assert_eq!(err.as_label(), "port_unavailable");

        store.set_unavailable(false);
        assert!(store.recent_metrics("queueLoad", 5).await.unwrap().is_empty());
    }
}

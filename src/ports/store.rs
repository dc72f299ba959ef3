use async_trait::async_trait;

use crate::error::PortError;

use super::records::{
    HealthRecord, KernelEventRecord, MetricSample, PredictiveInsight, RecoveryLogEntry,
    SystemAlert,
};

/// Persistence collaborator.
///
/// Only the operation shapes matter to the kernel; the schema behind them is
/// the backend's business. Every method may fail transiently.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Inserts or replaces the record keyed by `record.service_name`.
    async fn upsert_service_status(&self, record: HealthRecord) -> Result<(), PortError>;

    /// All health records, most recently updated first.
    async fn service_statuses(&self) -> Result<Vec<HealthRecord>, PortError>;

    async fn insert_metric(&self, sample: MetricSample) -> Result<(), PortError>;

    /// Up to `limit` samples for `metric_name`, newest first.
    async fn recent_metrics(
        &self,
        metric_name: &str,
        limit: usize,
    ) -> Result<Vec<MetricSample>, PortError>;

    async fn insert_insight(&self, insight: PredictiveInsight) -> Result<(), PortError>;

    /// Up to `limit` insights, newest first.
    async fn latest_insights(&self, limit: usize) -> Result<Vec<PredictiveInsight>, PortError>;

    /// Stores the alert and returns its assigned id.
    async fn insert_alert(&self, alert: SystemAlert) -> Result<u64, PortError>;

    /// Unacknowledged alerts, newest first.
    async fn active_alerts(&self) -> Result<Vec<SystemAlert>, PortError>;

    /// Marks an alert as acknowledged; `false` if the id is unknown.
    async fn acknowledge_alert(&self, id: u64) -> Result<bool, PortError>;

    async fn insert_recovery_log(&self, entry: RecoveryLogEntry) -> Result<(), PortError>;

    /// Up to `limit` recovery log entries, newest first.
    async fn recent_recovery_logs(&self, limit: usize)
    -> Result<Vec<RecoveryLogEntry>, PortError>;

    async fn insert_kernel_event(&self, record: KernelEventRecord) -> Result<(), PortError>;
}

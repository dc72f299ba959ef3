//! # Self-healing as a kernel service.
//!
//! [`SelfHealingService`] wires the queue monitor, the anomaly predictor, the
//! recovery engine and the rule engine together and plugs them into the kernel
//! lifecycle.
//!
//! ```text
//! init():   subscribe queue.stalled    ─► rules.evaluate_queue_rule(waiting)
//!           subscribe system.recovered ─► info!
//! start():  monitor.start(queue_interval)
//! stop():   monitor.stop()
//! health(): ONLINE while the monitor runs, OFFLINE otherwise
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::config::HealingConfig;
use crate::core::{HealthReport, KernelService};
use crate::error::{HandlerError, PortError, ServiceError};
use crate::events::{Event, EventBus, EventKind, Listener, SubscriptionId};
use crate::ports::{Cache, JobQueue, Store};

use super::monitor::QueueMonitor;
use super::predictor::AnomalyPredictor;
use super::recovery::RecoveryEngine;
use super::report::SystemReport;
use super::rules::{AutonomousRuleEngine, RuleOutcome};

/// Name under which the service registers.
pub const SELF_HEALING: &str = "self-healing";

struct StallResponder {
    rules: Arc<AutonomousRuleEngine>,
}

#[async_trait]
impl Listener for StallResponder {
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        let EventKind::QueueStalled(counters) = &event.kind else {
            return Err(HandlerError::Unexpected(event.topic().into_owned()));
        };
        match self.rules.evaluate_queue_rule(counters.waiting as f64).await {
            RuleOutcome::PredictorUnavailable => Err(HandlerError::Other(
                "queue rule skipped: risk evaluation unavailable".into(),
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "stall-responder"
    }
}

struct RecoveryNotice;

#[async_trait]
impl Listener for RecoveryNotice {
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        if let EventKind::SystemRecovered { target } = &event.kind {
            info!(system = %target, "autonomous recovery successful");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recovery-notice"
    }
}

/// Kernel service hosting the self-healing loop.
pub struct SelfHealingService {
    cfg: HealingConfig,
    bus: EventBus,
    store: Arc<dyn Store>,
    monitor: Arc<QueueMonitor>,
    recovery: Arc<RecoveryEngine>,
    rules: Arc<AutonomousRuleEngine>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl SelfHealingService {
    pub fn new(
        cfg: HealingConfig,
        store: Arc<dyn Store>,
        queue: Arc<dyn JobQueue>,
        cache: Arc<dyn Cache>,
        bus: EventBus,
    ) -> Arc<Self> {
        let monitor = QueueMonitor::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            bus.clone(),
            cfg.stall_threshold,
        );
        let recovery = Arc::new(RecoveryEngine::new(
            queue,
            cache,
            Arc::clone(&store),
            bus.clone(),
            cfg.scaled_concurrency,
        ));
        let rules = Arc::new(AutonomousRuleEngine::new(
            AnomalyPredictor::new(Arc::clone(&store), &cfg),
            Arc::clone(&recovery),
            Arc::clone(&store),
            cfg.cooldown,
        ));
        Arc::new(Self {
            cfg,
            bus,
            store,
            monitor,
            recovery,
            rules,
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    pub fn monitor(&self) -> &Arc<QueueMonitor> {
        &self.monitor
    }

    pub fn recovery(&self) -> &Arc<RecoveryEngine> {
        &self.recovery
    }

    pub fn rules(&self) -> &Arc<AutonomousRuleEngine> {
        &self.rules
    }

    /// Current alerts, recoveries and insights.
    pub async fn report(&self) -> Result<SystemReport, PortError> {
        SystemReport::collect(self.store.as_ref()).await
    }
}

#[async_trait]
impl KernelService for SelfHealingService {
    fn name(&self) -> &str {
        SELF_HEALING
    }

    async fn init(&self) -> Result<(), ServiceError> {
        let mut subs = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !subs.is_empty() {
            return Ok(());
        }
        let responder = Arc::new(StallResponder {
            rules: Arc::clone(&self.rules),
        });
        subs.push(self.bus.subscribe("queue.stalled", responder));
        subs.push(self.bus.subscribe("system.recovered", Arc::new(RecoveryNotice)));
        info!("self-healing hooks installed");
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.monitor.start(self.cfg.queue_interval_clamped());
        info!(interval = ?self.cfg.queue_interval_clamped(), "queue monitor started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.monitor.stop();
        let subs: Vec<SubscriptionId> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for id in subs {
            self.bus.unsubscribe(id);
        }
        Ok(())
    }

    async fn health(&self) -> Result<HealthReport, ServiceError> {
        let running = self.monitor.is_running();
        let report = if running {
            HealthReport::online()
        } else {
            HealthReport::offline()
        };
        Ok(report.with_metrics(json!({ "queue_monitor": running })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryCache, MemoryQueue, MemoryStore};
    use crate::core::HealthStatus;
    use crate::events::ListenerFn;
    use crate::healing::SystemRisk;
    use crate::healing::monitor::tests::FixedQueue;
    use crate::ports::{MetricSample, QueueCounters};
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn wait_until<F, Fut>(mut cond: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !cond().await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn lifecycle_drives_the_monitor() {
        let svc = SelfHealingService::new(
            HealingConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryQueue::new()),
            Arc::new(MemoryCache::new()),
            EventBus::new(),
        );
        assert_eq!(svc.health().await.unwrap().status, HealthStatus::Offline);

        svc.init().await.unwrap();
        svc.start().await.unwrap();
        let health = svc.health().await.unwrap();
        assert_eq!(health.status, HealthStatus::Online);
        assert_eq!(health.metrics.unwrap()["queue_monitor"], true);

        svc.stop().await.unwrap();
        assert_eq!(svc.health().await.unwrap().status, HealthStatus::Offline);
    }

    #[tokio::test]
    async fn stalled_queue_triggers_scaling_end_to_end() {
        let bus = EventBus::new();
        let store = Arc::new(MemoryStore::new());
        for _ in 0..5 {
            store
                .insert_metric(MetricSample::now("queueLoad", 10.0, "jobs"))
                .await
                .unwrap();
        }
        let queue = FixedQueue::new(QueueCounters {
            waiting: 1200,
            active: 5,
            ..Default::default()
        });
        let svc = SelfHealingService::new(
            HealingConfig::default(),
            store.clone(),
            queue,
            Arc::new(MemoryCache::new()),
            bus.clone(),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe(
            "system.recovered",
            ListenerFn::arc("tap", move |ev: Arc<Event>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(ev.kind.payload());
                    Ok::<_, HandlerError>(())
                }
            }),
        );

        svc.init().await.unwrap();
        // Records queueLoad 1205 and emits queue.stalled; 1200 waiting is a surge over the mean of 209.
        svc.monitor().run_cycle().await;

        let recovered = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recovered["target"], "LeadQueue");

        wait_until(|| {
            let store = store.clone();
            async move { !store.alerts().await.is_empty() }
        })
        .await;
        let report = svc.report().await.unwrap();
        assert_eq!(report.risk, SystemRisk::Critical);
        assert_eq!(report.recovery_actions[0].action_taken, "scaleWorkers");
        assert_eq!(report.insights.len(), 1);
    }

    #[tokio::test]
    async fn init_is_idempotent_and_stop_unsubscribes() {
        let bus = EventBus::new();
        let svc = SelfHealingService::new(
            HealingConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryQueue::new()),
            Arc::new(MemoryCache::new()),
            bus.clone(),
        );
        svc.init().await.unwrap();
        svc.init().await.unwrap();
        assert_eq!(bus.len(), 2);
        svc.stop().await.unwrap();
        assert!(bus.is_empty());
    }
}

//! # Health supervision.
//!
//! [`HealthSupervisor`] periodically asks every registered service for its
//! health and persists the answer, one [`HealthRecord`] per service.
//!
//! ## Cycle
//! ```text
//! every health_interval:
//!   for svc in registry.all_services():
//!       health() within health_timeout
//!         ├─ Ok(report)   → store.upsert_service_status(record)
//!         │                  └─ OFFLINE → error! + publish kernel.service_offline
//!         ├─ Err / timeout / panic → warn!, skip service (no record written)
//!         └─ store error  → warn!, next service
//! ```
//!
//! ## Rules
//! - No service check or store failure ever stops the loop, panics included.
//! - `stop_monitoring` lets a cycle in progress finish; only later cycles are suppressed.
//! - A service whose check fails keeps its previous record (stale, never deleted).
//! - `uptime_secs` is the kernel's uptime (seconds since boot), not the service's.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::core::registry::ServiceRegistry;
use crate::core::service::{HealthReport, HealthStatus, ServiceRef, contain};
use crate::core::ticker::Ticker;
use crate::error::ServiceError;
use crate::events::{Event, EventBus, KernelEvent};
use crate::ports::{HealthRecord, Store};

/// Tallies of one supervision cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Records written.
    pub recorded: usize,
    /// Health checks that errored, panicked or timed out.
    pub check_failures: usize,
    /// Records that could not be written.
    pub store_failures: usize,
    /// Services that reported `OFFLINE`.
    pub offline: usize,
}

/// Periodic health poller for registered services.
pub struct HealthSupervisor {
    registry: Arc<ServiceRegistry>,
    store: Arc<dyn Store>,
    bus: EventBus,
    region: String,
    deadline: Option<Duration>,
    booted_at: Instant,
    ticker: Ticker,
}

impl HealthSupervisor {
    /// Creates a supervisor. `deadline = None` waits for health checks indefinitely.
    pub fn new(
        registry: Arc<ServiceRegistry>,
        store: Arc<dyn Store>,
        bus: EventBus,
        region: impl Into<String>,
        deadline: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            store,
            bus,
            region: region.into(),
            deadline,
            booted_at: Instant::now(),
            ticker: Ticker::new("health-supervisor"),
        })
    }

    /// Runs one supervision pass over all registered services.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let uptime_secs = self.booted_at.elapsed().as_secs_f64();

        for service in self.registry.all_services().await {
            let name = service.name().to_string();
            let health = match self.check(&service).await {
                Ok(health) => health,
                Err(err) => {
                    report.check_failures += 1;
                    warn!(service = %name, label = err.as_label(), error = %err, "health check failed");
                    continue;
                }
            };

            if health.status == HealthStatus::Offline {
                report.offline += 1;
                error!(service = %name, "service reported OFFLINE");
                self.bus.publish(Event::kernel(KernelEvent::ServiceOffline {
                    service: name.as_str().into(),
                }));
            }

            let record = HealthRecord {
                service_name: name.clone(),
                status: health.status,
                uptime_secs,
                region: self.region.clone(),
                updated_at: Utc::now(),
            };
            match self.store.upsert_service_status(record).await {
                Ok(()) => {
                    report.recorded += 1;
                    debug!(service = %name, status = %health.status, "health recorded");
                }
                Err(err) => {
                    report.store_failures += 1;
                    warn!(service = %name, label = err.as_label(), error = %err, "failed to persist health");
                }
            }
        }
        report
    }

    /// Starts the periodic loop. Returns `false` if it is already running.
    pub fn start_monitoring(self: &Arc<Self>, interval: Duration) -> bool {
        let this = Arc::clone(self);
        self.ticker.start(interval, move || {
            let this = Arc::clone(&this);
            async move {
                let report = this.run_cycle().await;
                debug!(?report, "health cycle finished");
            }
        })
    }

    /// Stops the periodic loop. Returns `false` if it was not running.
    pub fn stop_monitoring(&self) -> bool {
        self.ticker.stop()
    }

    pub fn is_monitoring(&self) -> bool {
        self.ticker.is_running()
    }

    async fn check(&self, service: &ServiceRef) -> Result<HealthReport, ServiceError> {
        match self.deadline {
            Some(timeout) => tokio::time::timeout(timeout, contain("health", service.health()))
                .await
                .map_err(|_| ServiceError::Timeout { timeout })?,
            None => contain("health", service.health()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::core::registry::tests::{Bomb, Scripted, journal};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::core::service::KernelService;
    use async_trait::async_trait;

    fn svc(s: impl KernelService) -> ServiceRef {
        Arc::new(s)
    }

    struct Sleepy;

    #[async_trait]
    impl KernelService for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }
        async fn init(&self) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn start(&self) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn health(&self) -> Result<HealthReport, ServiceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(HealthReport::online())
        }
    }

    /// Answers `ONLINE` after `delay`, counting calls.
    struct Slow {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KernelService for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        async fn init(&self) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn start(&self) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn stop(&self) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn health(&self) -> Result<HealthReport, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(HealthReport::online())
        }
    }

    async fn setup(
        services: Vec<ServiceRef>,
        deadline: Option<Duration>,
    ) -> (Arc<HealthSupervisor>, Arc<MemoryStore>) {
        let bus = EventBus::new();
        let registry = ServiceRegistry::new(bus.clone());
        for s in services {
            registry.register(s).await.unwrap();
        }
        registry.start_all().await;
        let store = Arc::new(MemoryStore::new());
        let sup = HealthSupervisor::new(registry, store.clone(), bus, "EU-1", deadline);
        (sup, store)
    }

    #[tokio::test]
    async fn records_each_running_service() {
        let j = journal();
        let degraded = Scripted::new("mailer", &j);
        degraded.set_health(Ok(HealthReport::degraded()));
        let (sup, store) = setup(
            vec![svc(Scripted::new("db", &j)), svc(degraded)],
            None,
        )
        .await;

        let report = sup.run_cycle().await;
        assert_eq!(report.recorded, 2);

        let db = store.status_of("db").await.unwrap();
        assert_eq!(db.status, HealthStatus::Online);
        assert_eq!(db.region, "EU-1");
        assert_eq!(
            store.status_of("mailer").await.unwrap().status,
            HealthStatus::Degraded
        );
    }

    #[tokio::test]
    async fn failed_check_is_skipped_and_offline_is_recorded() {
        let j = journal();
        let broken = Scripted::new("broken", &j);
        broken.set_health(Err("socket closed".into()));
        let down = Scripted::new("down", &j);
        down.set_health(Ok(HealthReport::offline()));
        let (sup, store) = setup(
            vec![svc(broken), svc(down), svc(Scripted::new("ok", &j))],
            None,
        )
        .await;

        let report = sup.run_cycle().await;
        assert_eq!(report.check_failures, 1);
        assert_eq!(report.offline, 1);
        assert_eq!(report.recorded, 2);
        assert!(store.status_of("broken").await.is_none());
        assert_eq!(
            store.status_of("down").await.unwrap().status,
            HealthStatus::Offline
        );
    }

    #[tokio::test]
    async fn failed_check_keeps_previous_record() {
        let j = journal();
        let flaky = Arc::new(Scripted::new("flaky", &j));
        let (sup, store) = setup(vec![flaky.clone() as ServiceRef], None).await;

        sup.run_cycle().await;
        let first = store.status_of("flaky").await.unwrap();

        flaky.set_health(Err("timeout".into()));
        assert_eq!(sup.run_cycle().await.check_failures, 1);
        assert_eq!(store.status_of("flaky").await.unwrap(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_check_times_out() {
        let (sup, store) = setup(vec![svc(Sleepy)], Some(Duration::from_secs(5))).await;
        let report = sup.run_cycle().await;
        assert_eq!(report.check_failures, 1);
        assert!(store.status_of("sleepy").await.is_none());
    }

    #[tokio::test]
    async fn store_outage_does_not_stop_the_cycle() {
        let j = journal();
        let (sup, store) = setup(
            vec![svc(Scripted::new("a", &j)), svc(Scripted::new("b", &j))],
            None,
        )
        .await;
        store.set_unavailable(true);

        let report = sup.run_cycle().await;
        assert_eq!(report.store_failures, 2);
        assert!(j.lock().unwrap().contains(&"b.health".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn monitoring_loop_polls_periodically() {
        let j = journal();
        let (sup, store) = setup(vec![svc(Scripted::new("db", &j))], None).await;

        assert!(sup.start_monitoring(Duration::from_secs(30)));
        assert!(sup.is_monitoring());
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(store.status_of("db").await.is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.status_of("db").await.is_some());

        assert!(sup.stop_monitoring());
        assert!(!sup.is_monitoring());
    }

    #[tokio::test]
    async fn panicking_check_counts_as_failure() {
        let j = journal();
        let bomb = Bomb {
            name: "bomb",
            panics_in: "health",
        };
        let (sup, store) = setup(vec![svc(bomb), svc(Scripted::new("ok", &j))], None).await;

        let report = sup.run_cycle().await;
        assert_eq!(report.check_failures, 1);
        assert_eq!(report.recorded, 1);
        assert!(store.status_of("bomb").await.is_none());
        assert!(store.status_of("ok").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_service_does_not_kill_the_loop() {
        let j = journal();
        let bomb = Bomb {
            name: "bomb",
            panics_in: "health",
        };
        let (sup, store) = setup(vec![svc(bomb), svc(Scripted::new("ok", &j))], None).await;

        assert!(sup.start_monitoring(Duration::from_secs(30)));
        tokio::time::sleep(Duration::from_secs(200)).await;

        let polls = j
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == "ok.health")
            .count();
        assert_eq!(polls, 6);
        assert!(store.status_of("ok").await.is_some());

        assert!(sup.stop_monitoring());
        assert!(sup.start_monitoring(Duration::from_secs(30)));
        assert!(sup.stop_monitoring());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_the_cycle_in_progress_finish() {
        let slow = Arc::new(Slow {
            delay: Duration::from_secs(10),
            calls: AtomicUsize::new(0),
        });
        let (sup, store) = setup(vec![slow.clone() as ServiceRef], None).await;

        assert!(sup.start_monitoring(Duration::from_secs(30)));
        // First cycle starts at t=30s and is mid-check at t=35s.
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        assert!(store.status_of("slow").await.is_none());

        assert!(sup.stop_monitoring());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(store.status_of("slow").await.is_some());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }
}

//! # Composition root.
//!
//! [`Kernel`] owns the bus, the registry, the health supervisor and the event
//! gateway, and sequences their startup and shutdown.
//!
//! ## Boot / shutdown
//! ```text
//! boot():     gateway.start ─► kernel.booting ─► registry.start_all ─► supervisor.start ─► kernel.online
//! shutdown(): kernel.shutting_down ─► supervisor.stop ─► registry.stop_all ─► kernel.halted ─► gateway.stop
//! ```
//!
//! ## Rules
//! - Steps run strictly in the order above, never in parallel.
//! - The gateway starts first and stops last so it observes every kernel event.
//! - A replica node boots nothing: background loops run on the primary only.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use kernelvisor::{HealthReport, Kernel, KernelConfig, KernelService, ServiceError};
//!
//! struct Mailer;
//!
//! #[async_trait]
//! impl KernelService for Mailer {
//!     fn name(&self) -> &str { "mailer" }
//!     async fn init(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn start(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn health(&self) -> Result<HealthReport, ServiceError> {
//!         Ok(HealthReport::online())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), kernelvisor::KernelError> {
//!     let kernel = Kernel::builder(KernelConfig::default()).build();
//!     kernel.register(Arc::new(Mailer)).await?;
//!
//!     let summary = kernel.boot().await?;
//!     assert_eq!(summary.started, vec!["mailer"]);
//!
//!     kernel.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{KernelConfig, NodeRole};
use crate::error::{KernelError, PortError};
use crate::events::{Event, EventBus, KernelEvent};
use crate::ports::{HealthRecord, Store};

use super::builder::KernelBuilder;
use super::gateway::EventGateway;
use super::registry::{ServiceRegistry, ServiceState, StartSummary};
use super::service::ServiceRef;
use super::shutdown::ShutdownSignal;
use super::supervisor::HealthSupervisor;

/// One registered service as seen by topology reporting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceView {
    pub name: String,
    #[serde(flatten)]
    pub state: ServiceState,
}

/// Read-only projection of this node: who it is, what it runs, how healthy it is.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopologyReport {
    pub region: String,
    pub role: NodeRole,
    pub services: Vec<ServiceView>,
    pub health: Vec<HealthRecord>,
}

/// Event-driven micro-kernel.
pub struct Kernel {
    cfg: KernelConfig,
    bus: EventBus,
    store: Arc<dyn Store>,
    registry: Arc<ServiceRegistry>,
    supervisor: Arc<HealthSupervisor>,
    gateway: EventGateway,
    running: AtomicBool,
}

impl Kernel {
    /// Creates a builder for configuring the kernel.
    pub fn builder(cfg: KernelConfig) -> KernelBuilder {
        KernelBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: KernelConfig,
        bus: EventBus,
        store: Arc<dyn Store>,
        registry: Arc<ServiceRegistry>,
        supervisor: Arc<HealthSupervisor>,
        gateway: EventGateway,
    ) -> Self {
        Self {
            cfg,
            bus,
            store,
            registry,
            supervisor,
            gateway,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.cfg
    }

    /// The kernel's bus; clones share subscriptions.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Registers one service. Duplicate names are a fatal configuration error.
    pub async fn register(&self, service: ServiceRef) -> Result<(), KernelError> {
        self.registry.register(service).await
    }

    /// Registers services in order; the first duplicate aborts the batch.
    ///
    /// Services registered before the duplicate stay registered.
    pub async fn load_plugins(&self, plugins: Vec<ServiceRef>) -> Result<usize, KernelError> {
        let mut loaded = 0;
        for plugin in plugins {
            self.registry.register(plugin).await?;
            loaded += 1;
        }
        info!(loaded, "plugins loaded");
        Ok(loaded)
    }

    /// Runs the boot sequence.
    ///
    /// Service failures are isolated and reported in the returned summary; only
    /// calling `boot` twice is an error.
    pub async fn boot(&self) -> Result<StartSummary, KernelError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(KernelError::AlreadyBooted);
        }

        if !self.cfg.role.is_primary() {
            info!(region = %self.cfg.region, "replica node: kernel background loops stay on the primary");
            return Ok(StartSummary::default());
        }

        info!(region = %self.cfg.region, "kernel booting");
        self.gateway.start();
        self.bus.publish(Event::kernel(KernelEvent::Booting));

        let summary = self.registry.start_all().await;
        if !summary.failed.is_empty() {
            warn!(failed = summary.failed.len(), "some services failed to start");
        }

        self.supervisor
            .start_monitoring(self.cfg.health_interval_clamped());
        self.bus.publish(Event::kernel(KernelEvent::Online));
        info!(
            started = summary.started.len(),
            failed = summary.failed.len(),
            "kernel online"
        );
        Ok(summary)
    }

    /// Runs the shutdown sequence, the exact reverse of [`boot`](Self::boot).
    pub async fn shutdown(&self) -> Result<(), KernelError> {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(KernelError::NotBooted);
        }

        if !self.cfg.role.is_primary() {
            return Ok(());
        }

        info!("kernel shutting down");
        self.bus.publish(Event::kernel(KernelEvent::ShuttingDown));
        self.supervisor.stop_monitoring();

        let failures = self.registry.stop_all().await;
        if failures > 0 {
            warn!(failures, "some services failed to stop");
        }

        self.bus.publish(Event::kernel(KernelEvent::Halted));
        self.gateway.stop();
        info!("kernel halted");
        Ok(())
    }

    /// Boots, waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down.
    ///
    /// Shutdown runs even if signal registration fails; that error is returned afterwards.
    pub async fn run_until_signal(&self) -> Result<(), KernelError> {
        self.boot().await?;
        let waited = ShutdownSignal::wait().await;
        if let Ok(signal) = &waited {
            info!(%signal, "shutdown signal received");
        }
        self.shutdown().await?;
        waited.map(drop).map_err(KernelError::from)
    }

    /// Projects region, role, registered services and latest health records.
    pub async fn topology(&self) -> Result<TopologyReport, PortError> {
        let services = self
            .registry
            .states()
            .await
            .into_iter()
            .map(|(name, state)| ServiceView { name, state })
            .collect();
        Ok(TopologyReport {
            region: self.cfg.region.clone(),
            role: self.cfg.role,
            services,
            health: self.store.service_statuses().await?,
        })
    }
}

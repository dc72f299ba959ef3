//! # Service registry - insertion-ordered catalogue of kernel services.
//!
//! The registry owns every [`ServiceRef`] for the lifetime of the process and
//! drives their startup and shutdown.
//!
//! ## Architecture
//! ```text
//! register(svc) ──► entries: Vec<Entry>   (registration order)
//!
//! start_all():  for svc in order ─► init() ─► start()
//!                                    ├─ Ok  → Running,  publish kernel.service_started
//!                                    └─ Err → Failed,   publish kernel.service_failed
//!
//! stop_all():   for svc in order ─► stop()  (errors logged, never abort the loop)
//! ```
//!
//! ## Rules
//! - Names are unique: a duplicate registration is a fatal configuration error
//!   and leaves the registry untouched.
//! - One failing service never aborts the others (isolation); no retry.
//!   A panic inside `init`, `start` or `stop` counts as a failure.
//! - The lock is never held across a service call.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::core::service::{ServiceRef, contain};
use crate::error::KernelError;
use crate::events::{Event, EventBus, KernelEvent};

/// Lifecycle state of a registered service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServiceState {
    /// Registered, not started yet.
    Registered,
    /// `init` and `start` succeeded.
    Running,
    /// `init`, `start` or `stop` failed.
    Failed { reason: String },
    /// `stop` succeeded.
    Stopped,
}

struct Entry {
    service: ServiceRef,
    state: ServiceState,
}

impl Entry {
    fn name(&self) -> &str {
        self.service.name()
    }
}

/// Outcome of [`ServiceRegistry::start_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StartSummary {
    /// Services now running, in start order.
    pub started: Vec<String>,
    /// Services that failed, with the error message.
    pub failed: Vec<(String, String)>,
}

/// Name-indexed, insertion-ordered registry of kernel services.
pub struct ServiceRegistry {
    entries: RwLock<Vec<Entry>>,
    bus: EventBus,
}

impl ServiceRegistry {
    /// Creates an empty registry that reports lifecycle events on `bus`.
    pub fn new(bus: EventBus) -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(Vec::new()),
            bus,
        })
    }

    /// Adds a service.
    ///
    /// Fails with [`KernelError::DuplicateService`] if the name is taken; the
    /// registry is not modified in that case.
    pub async fn register(&self, service: ServiceRef) -> Result<(), KernelError> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.name() == service.name()) {
            return Err(KernelError::DuplicateService {
                name: service.name().to_string(),
            });
        }
        info!(service = service.name(), "registered service");
        entries.push(Entry {
            service,
            state: ServiceState::Registered,
        });
        Ok(())
    }

    /// Looks a service up by name.
    pub async fn get_service(&self, name: &str) -> Option<ServiceRef> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.name() == name)
            .map(|e| Arc::clone(&e.service))
    }

    /// All services in registration order.
    pub async fn all_services(&self) -> Vec<ServiceRef> {
        let entries = self.entries.read().await;
        entries.iter().map(|e| Arc::clone(&e.service)).collect()
    }

    /// Services currently in [`ServiceState::Running`], in registration order.
    pub async fn running_services(&self) -> Vec<ServiceRef> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.state == ServiceState::Running)
            .map(|e| Arc::clone(&e.service))
            .collect()
    }

    /// `(name, state)` pairs in registration order.
    pub async fn states(&self) -> Vec<(String, ServiceState)> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|e| (e.name().to_string(), e.state.clone()))
            .collect()
    }

    /// Current state of one service.
    pub async fn state_of(&self, name: &str) -> Option<ServiceState> {
        let entries = self.entries.read().await;
        entries.iter().find(|e| e.name() == name).map(|e| e.state.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Runs `init` then `start` on every service, in registration order.
    ///
    /// A failure is logged, recorded as [`ServiceState::Failed`] and published
    /// as `kernel.service_failed`; the loop continues with the next service.
    pub async fn start_all(&self) -> StartSummary {
        let mut summary = StartSummary::default();

        for service in self.all_services().await {
            let name = service.name().to_string();
            info!(service = %name, "starting service");

            let result = match contain("init", service.init()).await {
                Ok(()) => contain("start", service.start()).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    info!(service = %name, "service started");
                    self.set_state(&name, ServiceState::Running).await;
                    self.bus.publish(Event::kernel(KernelEvent::ServiceStarted {
                        service: name.as_str().into(),
                    }));
                    summary.started.push(name);
                }
                Err(err) => {
                    error!(service = %name, label = err.as_label(), error = %err, "service failed to start");
                    let reason = err.to_string();
                    self.set_state(
                        &name,
                        ServiceState::Failed {
                            reason: reason.clone(),
                        },
                    )
                    .await;
                    self.bus.publish(Event::kernel(KernelEvent::ServiceFailed {
                        service: name.as_str().into(),
                        reason: reason.as_str().into(),
                    }));
                    summary.failed.push((name, reason));
                }
            }
        }
        summary
    }

    /// Calls `stop` on every service, in registration order, swallowing errors.
    ///
    /// Returns the number of services whose `stop` failed.
    pub async fn stop_all(&self) -> usize {
        let mut failures = 0;
        for service in self.all_services().await {
            let name = service.name().to_string();
            match contain("stop", service.stop()).await {
                Ok(()) => {
                    info!(service = %name, "service stopped");
                    self.set_state(&name, ServiceState::Stopped).await;
                }
                Err(err) => {
                    failures += 1;
                    warn!(service = %name, label = err.as_label(), error = %err, "service failed to stop");
                    self.set_state(
                        &name,
                        ServiceState::Failed {
                            reason: err.to_string(),
                        },
                    )
                    .await;
                }
            }
        }
        failures
    }

    async fn set_state(&self, name: &str, state: ServiceState) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.iter_mut().find(|e| e.name() == name) {
            entry.state = state;
        }
    }
}

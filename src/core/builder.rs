use std::sync::Arc;

use crate::{
    adapters::MemoryStore,
    config::KernelConfig,
    events::{EventBus, ListenerRef},
    ports::Store,
};
use super::{
    gateway::EventGateway, kernel::Kernel, registry::ServiceRegistry,
    supervisor::HealthSupervisor,
};

/// Builder for constructing a [`Kernel`] with optional collaborators.
pub struct KernelBuilder {
    cfg: KernelConfig,
    store: Option<Arc<dyn Store>>,
    bus: Option<EventBus>,
    listeners: Vec<(String, ListenerRef)>,
}

impl KernelBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: KernelConfig) -> Self {
        Self {
            cfg,
            store: None,
            bus: None,
            listeners: Vec::new(),
        }
    }

    /// Sets the persistence collaborator. Defaults to a fresh [`MemoryStore`].
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Shares an existing bus (e.g. one the HTTP layer already publishes on).
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Adds a listener subscribed at build time.
    ///
    /// `pattern` is an exact topic (`"lead.created"`) or a prefix wildcard (`"kernel.*"`).
    pub fn with_listener(mut self, pattern: impl Into<String>, listener: ListenerRef) -> Self {
        self.listeners.push((pattern.into(), listener));
        self
    }

    /// Builds the kernel.
    ///
    /// Subscribes the configured listeners, so it must be called within a tokio runtime.
    /// Nothing runs in the background until [`Kernel::boot`].
    pub fn build(self) -> Kernel {
        let bus = self.bus.unwrap_or_default();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn Store>);

        for (pattern, listener) in self.listeners {
            bus.subscribe(&pattern, listener);
        }

        let registry = ServiceRegistry::new(bus.clone());
        let supervisor = HealthSupervisor::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            bus.clone(),
            self.cfg.region.clone(),
            self.cfg.health_deadline(),
        );
        let gateway = EventGateway::new(self.cfg.region.clone(), Arc::clone(&store), bus.clone());

        Kernel::new_internal(self.cfg, bus, store, registry, supervisor, gateway)
    }
}

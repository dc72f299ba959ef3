//! # Kernel event replication.
//!
//! [`EventGateway`] subscribes to `kernel.*` on the bus and persists each event
//! as a [`KernelEventRecord`] tagged with the node's region, so other nodes and
//! dashboards can follow this node's lifecycle.
//!
//! ```text
//! bus ──kernel.*──► Replicator ──insert_kernel_event──► Store
//! ```
//!
//! Store failures are logged by the bus worker and otherwise ignored.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::error::HandlerError;
use crate::events::{Event, EventBus, Listener, SubscriptionId};
use crate::ports::{KernelEventRecord, Store};

const KERNEL_TOPICS: &str = "kernel.*";

struct Replicator {
    region: String,
    store: Arc<dyn Store>,
}

#[async_trait]
impl Listener for Replicator {
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        let record = KernelEventRecord {
            event_type: event.topic().into_owned(),
            payload: event.kind.payload(),
            region: self.region.clone(),
            created_at: Utc::now(),
        };
        self.store.insert_kernel_event(record).await?;
        debug!(seq = event.seq, topic = %event.topic(), "kernel event replicated");
        Ok(())
    }

    fn name(&self) -> &str {
        "event-gateway"
    }
}

/// Replicates `kernel.*` events into the store while started.
pub struct EventGateway {
    region: String,
    store: Arc<dyn Store>,
    bus: EventBus,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl EventGateway {
    pub fn new(region: impl Into<String>, store: Arc<dyn Store>, bus: EventBus) -> Self {
        Self {
            region: region.into(),
            store,
            bus,
            subscription: Mutex::new(None),
        }
    }

    /// Subscribes to `kernel.*`. Returns `false` if already started.
    pub fn start(&self) -> bool {
        let mut slot = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        let replicator = Arc::new(Replicator {
            region: self.region.clone(),
            store: Arc::clone(&self.store),
        });
        *slot = Some(self.bus.subscribe(KERNEL_TOPICS, replicator));
        info!(region = %self.region, "event gateway started");
        true
    }

    /// Unsubscribes. Events already handed to the gateway are still written.
    pub fn stop(&self) -> bool {
        let id = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match id {
            Some(id) => {
                self.bus.unsubscribe(id);
                info!("event gateway stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::events::{EventKind, KernelEvent};
    use std::time::Duration;

    async fn wait_for_records(store: &MemoryStore, n: usize) -> Vec<KernelEventRecord> {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let records = store.kernel_events().await;
                if records.len() >= n {
                    return records;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("kernel events were not replicated")
    }

    #[tokio::test]
    async fn replicates_only_kernel_events() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new();
        let gw = EventGateway::new("EU-1", store.clone(), bus.clone());
        assert!(gw.start());
        assert!(!gw.start());

        bus.emit(EventKind::UserLoggedIn { user_id: "u1".into() });
        bus.emit(EventKind::Kernel(KernelEvent::ServiceStarted {
            service: "mailer".into(),
        }));

        let records = wait_for_records(&store, 1).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, "kernel.service_started");
        assert_eq!(records[0].payload["service"], "mailer");
        assert_eq!(records[0].region, "EU-1");
    }

    #[tokio::test]
    async fn stop_detaches_from_the_bus() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new();
        let gw = EventGateway::new("EU-1", store.clone(), bus.clone());
        gw.start();
        assert!(gw.stop());
        assert!(!gw.is_running());
        assert_eq!(bus.emit(EventKind::Kernel(KernelEvent::Halted)), 0);
    }
}

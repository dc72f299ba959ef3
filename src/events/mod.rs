//! Events: data model, topics, listeners and the bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`KernelEvent`] typed events, one variant per event name
//! - [`Topic`] exact / wildcard subscription patterns
//! - [`Listener`], [`ListenerFn`] the handler extension point
//! - [`EventBus`] topic-routed, fire-and-forget fan-out
//!
//! ## Quick reference
//! - **Publishers**: `Kernel` and `ServiceRegistry` (`kernel.*`), `HealthSupervisor`
//!   (`kernel.service_offline`), `QueueMonitor` (`queue.stalled`), `RecoveryEngine`
//!   (`system.recovered`), the HTTP layer (`lead.created`, `user.logged_in`).
//! - **Consumers**: `EventGateway` (`kernel.*`), `SelfHealingService`
//!   (`queue.stalled`, `system.recovered`), domain listeners (`lead.created`,
//!   `user.logged_in`).

mod bus;
mod event;
mod listener;
mod topic;

pub use bus::{EventBus, SubscriptionId};
pub use event::{Event, EventKind, KernelEvent, LeadPayload};
pub use listener::{Listener, ListenerFn, ListenerRef};
pub use topic::Topic;

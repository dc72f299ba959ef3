//! # Domain and kernel events carried by the bus.
//!
//! [`EventKind`] is a tagged union over every event name the system knows:
//! - **Domain events**: `lead.created`, `user.logged_in`
//! - **Self-healing events**: `queue.stalled`, `system.recovered`
//! - **Kernel events**: `kernel.*` (boot, per-service lifecycle, shutdown)
//! - **Custom events**: any other topic with an opaque JSON payload
//!
//! Listeners pattern-match on the kind instead of trusting untyped data.
//! [`Event`] wraps a kind with a sequence number and emission time.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use kernelvisor::{Event, EventKind, KernelEvent, QueueCounters};
//!
//! let ev = Event::new(EventKind::QueueStalled(QueueCounters {
//!     waiting: 1200,
//!     active: 5,
//!     ..Default::default()
//! }));
//! assert_eq!(ev.topic(), "queue.stalled");
//!
//! let boot = Event::new(EventKind::Kernel(KernelEvent::Booting));
//! assert_eq!(boot.topic(), "kernel.booting");
//! assert!(boot.seq > ev.seq);
//! ```

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde::Serialize;
use serde_json::{Value, json};

use crate::ports::QueueCounters;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Payload of `lead.created`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeadPayload {
    pub email: String,
    pub name: String,
    /// Free-form form fields forwarded to the processing job.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl LeadPayload {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            details: Value::Null,
        }
    }
}

/// Kernel lifecycle events, all published under the `kernel.` prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelEvent {
    /// Boot sequence began.
    Booting,
    /// A service finished `init` + `start`.
    ServiceStarted { service: Arc<str> },
    /// A service failed `init` or `start`; the rest of the boot continues.
    ServiceFailed { service: Arc<str>, reason: Arc<str> },
    /// Health supervision saw a service report `OFFLINE`.
    ServiceOffline { service: Arc<str> },
    /// Boot sequence complete.
    Online,
    /// Shutdown sequence began.
    ShuttingDown,
    /// Shutdown sequence complete.
    Halted,
}

impl KernelEvent {
    fn suffix(&self) -> &'static str {
        match self {
            KernelEvent::Booting => "booting",
            KernelEvent::ServiceStarted { .. } => "service_started",
            KernelEvent::ServiceFailed { .. } => "service_failed",
            KernelEvent::ServiceOffline { .. } => "service_offline",
            KernelEvent::Online => "online",
            KernelEvent::ShuttingDown => "shutting_down",
            KernelEvent::Halted => "halted",
        }
    }
}

/// Classification of events, one variant per known event name.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// `lead.created`: a new lead was captured by the website.
    LeadCreated(LeadPayload),
    /// `user.logged_in`: an admin user authenticated.
    UserLoggedIn { user_id: Arc<str> },
    /// `queue.stalled`: queue backlog crossed the stall threshold.
    QueueStalled(QueueCounters),
    /// `system.recovered`: a recovery action restored `target`.
    SystemRecovered { target: Arc<str> },
    /// `kernel.<suffix>`: kernel lifecycle.
    Kernel(KernelEvent),
    /// Any other topic.
    Custom { topic: Arc<str>, payload: Value },
}

impl EventKind {
    /// Dotted topic name used for subscription matching.
    pub fn topic(&self) -> Cow<'_, str> {
        match self {
            EventKind::LeadCreated(_) => Cow::Borrowed("lead.created"),
            EventKind::UserLoggedIn { .. } => Cow::Borrowed("user.logged_in"),
            EventKind::QueueStalled(_) => Cow::Borrowed("queue.stalled"),
            EventKind::SystemRecovered { .. } => Cow::Borrowed("system.recovered"),
            EventKind::Kernel(k) => Cow::Owned(format!("kernel.{}", k.suffix())),
            EventKind::Custom { topic, .. } => Cow::Borrowed(topic.as_ref()),
        }
    }

    /// Structured payload, as persisted by the event gateway.
    pub fn payload(&self) -> Value {
        match self {
            EventKind::LeadCreated(lead) => json!(lead),
            EventKind::UserLoggedIn { user_id } => json!({ "user_id": &**user_id }),
            EventKind::QueueStalled(counters) => json!(counters),
            EventKind::SystemRecovered { target } => json!({ "target": &**target }),
            EventKind::Kernel(k) => match k {
                KernelEvent::ServiceStarted { service }
                | KernelEvent::ServiceOffline { service } => {
                    json!({ "service": &**service })
                }
                KernelEvent::ServiceFailed { service, reason } => {
                    json!({ "service": &**service, "reason": &**reason })
                }
                KernelEvent::Booting
                | KernelEvent::Online
                | KernelEvent::ShuttingDown
                | KernelEvent::Halted => json!({}),
            },
            EventKind::Custom { payload, .. } => payload.clone(),
        }
    }
}

/// Event with ordering metadata.
///
/// - `seq`: monotonic global sequence
/// - `at`: wall-clock emission time
/// - `kind`: what happened, with its payload
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification and payload.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
        }
    }

    /// Shorthand for a kernel lifecycle event.
    #[inline]
    pub fn kernel(k: KernelEvent) -> Self {
        Self::new(EventKind::Kernel(k))
    }

    /// Shorthand for a custom topic.
    #[inline]
    pub fn custom(topic: impl Into<Arc<str>>, payload: Value) -> Self {
        Self::new(EventKind::Custom {
            topic: topic.into(),
            payload,
        })
    }

    /// Dotted topic name.
    #[inline]
    pub fn topic(&self) -> Cow<'_, str> {
        self.kind.topic()
    }

    #[inline]
    pub fn is_kernel(&self) -> bool {
        matches!(self.kind, EventKind::Kernel(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_topics_share_prefix() {
        let started = EventKind::Kernel(KernelEvent::ServiceStarted {
            service: "mailer".into(),
        });
        assert_eq!(started.topic(), "kernel.service_started");
        assert_eq!(started.payload(), json!({ "service": "mailer" }));
        assert_eq!(EventKind::Kernel(KernelEvent::Halted).topic(), "kernel.halted");
    }

    #[test]
    fn stalled_payload_carries_counters() {
        let kind = EventKind::QueueStalled(QueueCounters {
            active: 5,
            waiting: 1200,
            completed: 0,
            failed: 0,
        });
        let payload = kind.payload();
        assert_eq!(payload["waiting"], 1200);
        assert_eq!(payload["active"], 5);
    }

    #[test]
    fn custom_topic_is_passed_through() {
        let ev = Event::custom("billing.invoice_paid", json!({ "id": 7 }));
        assert_eq!(ev.topic(), "billing.invoice_paid");
        assert_eq!(ev.kind.payload(), json!({ "id": 7 }));
        assert!(!ev.is_kernel());
    }
}

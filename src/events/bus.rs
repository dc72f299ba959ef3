//! # Process-wide publish/subscribe hub.
//!
//! [`EventBus`] routes each [`Event`] to every subscription whose [`Topic`]
//! matches the event's name, without awaiting the listeners.
//!
//! ## Architecture
//! ```text
//! publish(Event)
//!     │             (Arc-clone per matching subscription, registration order)
//!     ├──────────► [queue S1] ─► worker S1 ─► listener1.on_event()
//!     ├──────────► [queue S2] ─► worker S2 ─► listener2.on_event()
//!     └──────────► [queue SN] ─► worker SN ─► listenerN.on_event()
//! ```
//!
//! ## Rules
//! - **Fire-and-forget**: `publish()` never awaits; it only enqueues and returns.
//! - **Registration order**: matching subscriptions receive the event in the
//!   order they subscribed; each worker processes its queue FIFO.
//! - **Isolation**: a listener error or panic is logged for that listener only;
//!   other listeners of the same event are unaffected.
//! - **No persistence**: an event with no matching subscription is dropped;
//!   events still queued when the process dies are lost.
//! - **No backpressure**: queues are unbounded; keep listener work short or
//!   delegate it to the job queue.
//!
//! `subscribe()` spawns the worker on the current tokio runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{Event, EventKind, ListenerRef, Topic};
use crate::error::panic_message;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    name: String,
    sender: mpsc::UnboundedSender<Arc<Event>>,
}

#[derive(Default)]
struct Inner {
    subs: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

/// Topic-routed event bus.
///
/// ### Properties
/// - **Cloneable**: cheap to clone (internally an `Arc`); all clones share subscriptions.
/// - **Synchronous publish**: usable from sync and async code alike.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates a bus with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events matching `pattern` (`"queue.stalled"`, `"kernel.*"`, `"*"`).
    ///
    /// Spawns the subscription's worker task; must be called within a tokio runtime.
    pub fn subscribe(&self, pattern: &str, listener: ListenerRef) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let topic = Topic::parse(pattern);
        let name = listener.name().to_string();
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<Event>>();

        let worker_topic = topic.clone();
        tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = listener.deliver(Arc::clone(&ev));
                match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(
                            listener = listener.name(),
                            topic = %ev.topic(),
                            label = err.as_label(),
                            error = %err,
                            "listener failed"
                        );
                    }
                    Err(panic) => {
                        error!(
                            listener = listener.name(),
                            topic = %ev.topic(),
                            panic = %panic_message(&*panic),
                            "listener panicked"
                        );
                    }
                }
            }
            debug!(listener = listener.name(), topic = %worker_topic, "subscription closed");
        });

        debug!(listener = %name, topic = %topic, "subscribed");
        self.write_subs().push(Subscription {
            id,
            topic,
            name,
            sender: tx,
        });
        id
    }

    /// Removes a subscription. Events already queued for it are still delivered.
    ///
    /// Returns `false` if the id is unknown (already removed).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.write_subs();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        before != subs.len()
    }

    /// Publishes an event to every matching subscription.
    ///
    /// Returns the number of listeners the event was handed to (`0` if nobody listens).
    pub fn publish(&self, ev: Event) -> usize {
        let topic = ev.topic().into_owned();
        let ev = Arc::new(ev);
        let subs = self.read_subs();

        let mut delivered = 0;
        for sub in subs.iter().filter(|s| s.topic.matches(&topic)) {
            match sub.sender.send(Arc::clone(&ev)) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    warn!(listener = %sub.name, topic = %topic, "listener worker closed; event dropped");
                }
            }
        }
        delivered
    }

    /// Shorthand for `publish(Event::new(kind))`.
    #[inline]
    pub fn emit(&self, kind: EventKind) -> usize {
        self.publish(Event::new(kind))
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.read_subs().len()
    }

    /// True if there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_subs(&self) -> std::sync::RwLockReadGuard<'_, Vec<Subscription>> {
        self.inner.subs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_subs(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Subscription>> {
        self.inner
            .subs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::events::{KernelEvent, ListenerFn};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedSender;

    fn recorder(name: &'static str, tx: UnboundedSender<(&'static str, u64)>) -> ListenerRef {
        ListenerFn::arc(name, move |ev: Arc<Event>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((name, ev.seq));
                Ok::<_, HandlerError>(())
            }
        })
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<(&'static str, u64)>) -> (&'static str, u64) {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("listener was not invoked")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = EventBus::new();
        assert!(bus.is_empty());
        assert_eq!(bus.emit(EventKind::Kernel(KernelEvent::Online)), 0);
    }

    #[tokio::test]
    async fn exact_and_wildcard_subscriptions_route_by_topic() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe("queue.stalled", recorder("exact", tx.clone()));
        bus.subscribe("kernel.*", recorder("kernel", tx.clone()));

        assert_eq!(bus.emit(EventKind::Kernel(KernelEvent::Booting)), 1);
        assert_eq!(recv(&mut rx).await.0, "kernel");

        let ev = Event::new(EventKind::QueueStalled(Default::default()));
        let seq = ev.seq;
        assert_eq!(bus.publish(ev), 1);
        assert_eq!(recv(&mut rx).await, ("exact", seq));

        assert_eq!(bus.emit(EventKind::UserLoggedIn { user_id: "u1".into() }), 0);
    }

    #[tokio::test]
    async fn failing_listener_does_not_block_others() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        bus.subscribe(
            "lead.created",
            ListenerFn::arc("broken", |_ev: Arc<Event>| async {
                Err::<(), _>(HandlerError::Other("smtp down".into()))
            }),
        );
        bus.subscribe(
            "lead.created",
            ListenerFn::arc("panicky", |ev: Arc<Event>| async move {
                if ev.seq != u64::MAX {
                    panic!("listener bug");
                }
                Ok::<_, HandlerError>(())
            }),
        );
        bus.subscribe("lead.created", recorder("healthy", tx));

        for _ in 0..2 {
            let n = bus.emit(EventKind::LeadCreated(crate::events::LeadPayload::new(
                "ana@example.com",
                "Ana",
            )));
            assert_eq!(n, 3);
        }

        assert_eq!(recv(&mut rx).await.0, "healthy");
        assert_eq!(recv(&mut rx).await.0, "healthy");
    }

    #[tokio::test]
    async fn per_listener_delivery_is_fifo() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe("*", recorder("all", tx));

        let seqs: Vec<u64> = (0..5)
            .map(|i| {
                let ev = Event::custom(format!("tick.{i}"), serde_json::Value::Null);
                let seq = ev.seq;
                bus.publish(ev);
                seq
            })
            .collect();

        for expected in seqs {
            assert_eq!(recv(&mut rx).await.1, expected);
        }
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = bus.subscribe("kernel.*", recorder("gateway", tx));

        assert_eq!(bus.len(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.emit(EventKind::Kernel(KernelEvent::Halted)), 0);
    }

    #[tokio::test]
    async fn closure_listeners_share_one_event() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<Event>>();
        for name in ["first", "second"] {
            let tx = tx.clone();
            bus.subscribe(
                "queue.stalled",
                ListenerFn::arc(name, move |ev: Arc<Event>| {
                    let tx = tx.clone();
                    async move {
                        let _ = tx.send(ev);
                        Ok::<_, HandlerError>(())
                    }
                }),
            );
        }
        bus.emit(EventKind::QueueStalled(Default::default()));

        let timeout = Duration::from_secs(1);
        let a = tokio::time::timeout(timeout, rx.recv()).await.unwrap().unwrap();
        let b = tokio::time::timeout(timeout, rx.recv()).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}

//! # Event listener trait.
//!
//! Provides [`Listener`] an extension point for reacting to bus events, and
//! [`ListenerFn`] a closure-backed implementation.
//!
//! Each subscription gets:
//! - **Dedicated worker task** (runs independently of the publisher)
//! - **Per-subscription unbounded queue** (events handed over in publish order)
//! - **Error boundary** (returned errors and panics are logged, never propagated)
//!
//! ## Architecture
//! ```text
//! EventBus::publish ──► [queue] ──► worker task ──► listener.deliver(Arc<Event>)
//!                                               ├─► Err(e)  → warn!, continue
//!                                               └─► panic   → error!, continue
//! ```
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use kernelvisor::{Event, EventKind, HandlerError, Listener};
//!
//! struct RecoveryCounter;
//!
//! #[async_trait]
//! impl Listener for RecoveryCounter {
//!     async fn on_event(&self, ev: &Event) -> Result<(), HandlerError> {
//!         if let EventKind::SystemRecovered { target } = &ev.kind {
//!             let _ = target; // bump a counter, notify admins, ...
//!         }
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str { "recovery-counter" }
//! }
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::Event;

/// Bus event listener.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Keep work short or delegate it to the job queue: fan-out has no backpressure.
/// - Return errors instead of panicking; both are contained, but errors log cleaner.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the subscription's worker task, not in the publisher context.
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError>;

    /// Entry point used by the bus worker, which owns a shared handle to the event.
    ///
    /// The default borrows it into [`on_event`](Self::on_event).
    async fn deliver(&self, event: Arc<Event>) -> Result<(), HandlerError> {
        self.on_event(&event).await
    }

    /// Returns the listener name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a listener.
pub type ListenerRef = Arc<dyn Listener>;

/// Closure-backed listener.
///
/// Wraps `F: Fn(Arc<Event>) -> Fut`, producing a fresh future per event.
/// Shared state must be captured explicitly (e.g. through an `Arc`).
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the listener and returns it as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use std::sync::Arc;
    /// use kernelvisor::{Event, HandlerError, ListenerFn, ListenerRef};
    ///
    /// let l: ListenerRef = ListenerFn::arc("noop", |_ev: Arc<Event>| async {
    ///     Ok::<_, HandlerError>(())
    /// });
    /// assert_eq!(l.name(), "noop");
    /// ```
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Listener for ListenerFn<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        (self.f)(Arc::new(event.clone())).await
    }

    async fn deliver(&self, event: Arc<Event>) -> Result<(), HandlerError> {
        (self.f)(event).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

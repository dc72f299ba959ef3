//! # Logging listener for debugging and demos.
//!
//! [`LogWriter`] writes every event it receives through `tracing`, one line per
//! event, with the topic and its JSON payload. Subscribe it to `"*"` to trace
//! the whole bus or to a prefix such as `"kernel.*"`.
//!
//! ## Output format
//! ```text
//! INFO kernelvisor::listeners::log: event seq=3 topic=kernel.service_started payload={"service":"mailer"}
//! WARN kernelvisor::listeners::log: event seq=9 topic=queue.stalled payload={"active":5,...}
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use kernelvisor::{Kernel, KernelConfig, LogWriter};
//! # async fn demo() {
//! let kernel = Kernel::builder(KernelConfig::default())
//!     .with_listener("*", Arc::new(LogWriter))
//!     .build();
//! # }
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::HandlerError;
use crate::events::{Event, EventKind, KernelEvent, Listener};

/// Event tracing listener.
///
/// Enabled via the `logging` feature. Warning-worthy events (`queue.stalled`,
/// failed or offline services) are logged at `WARN`, the rest at `INFO`.
pub struct LogWriter;

impl LogWriter {
    fn is_warning(kind: &EventKind) -> bool {
        matches!(
            kind,
            EventKind::QueueStalled(_)
                | EventKind::Kernel(
                    KernelEvent::ServiceFailed { .. } | KernelEvent::ServiceOffline { .. }
                )
        )
    }
}

#[async_trait]
impl Listener for LogWriter {
    async fn on_event(&self, e: &Event) -> Result<(), HandlerError> {
        let topic = e.topic();
        let payload = e.kind.payload();
        if Self::is_warning(&e.kind) {
            warn!(seq = e.seq, %topic, %payload, "event");
        } else {
            info!(seq = e.seq, %topic, %payload, "event");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log-writer"
    }
}

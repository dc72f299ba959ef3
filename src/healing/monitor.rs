//! # Queue backlog monitor.
//!
//! Every `queue_interval` the monitor reads the job-queue counters, records a
//! `queueLoad` sample (`active + waiting`) and raises `queue.stalled` when
//! `waiting` exceeds the stall threshold.
//!
//! ```text
//! tick ─► queue.counters() ─┬─ Err → warn!, skip cycle
//!                           └─ Ok(c) ─► store.insert_metric(queueLoad = c.load())
//!                                     └─ c.waiting > threshold → emit queue.stalled(c)
//! ```
//!
//! A failed metric write does not suppress the stall event.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::Ticker;
use crate::events::{EventBus, EventKind};
use crate::ports::{JobQueue, MetricSample, QueueCounters, Store};

/// Metric name under which queue load samples are stored.
pub const QUEUE_LOAD_METRIC: &str = "queueLoad";

const QUEUE_LOAD_UNIT: &str = "jobs";

/// What one monitoring cycle observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueReading {
    /// Counters could not be read; nothing was recorded.
    Unavailable,
    /// Counters were read; `stalled` tells whether `queue.stalled` was emitted.
    Read { counters: QueueCounters, stalled: bool },
}

/// Periodic queue poller.
pub struct QueueMonitor {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn Store>,
    bus: EventBus,
    stall_threshold: u64,
    ticker: Ticker,
}

impl QueueMonitor {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn Store>,
        bus: EventBus,
        stall_threshold: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            store,
            bus,
            stall_threshold,
            ticker: Ticker::new("queue-monitor"),
        })
    }

    /// Runs one monitoring cycle.
    pub async fn run_cycle(&self) -> QueueReading {
        let counters = match self.queue.counters().await {
            Ok(c) => c,
            Err(err) => {
                warn!(label = err.as_label(), error = %err, "failed to read queue counters");
                return QueueReading::Unavailable;
            }
        };

        let sample = MetricSample::now(QUEUE_LOAD_METRIC, counters.load() as f64, QUEUE_LOAD_UNIT);
        if let Err(err) = self.store.insert_metric(sample).await {
            warn!(label = err.as_label(), error = %err, "failed to record queue load");
        }

        let stalled = counters.waiting > self.stall_threshold;
        if stalled {
            warn!(
                waiting = counters.waiting,
                active = counters.active,
                threshold = self.stall_threshold,
                "queue stalled"
            );
            self.bus.emit(EventKind::QueueStalled(counters));
        } else {
            debug!(waiting = counters.waiting, active = counters.active, "queue load recorded");
        }
        QueueReading::Read { counters, stalled }
    }

    /// Starts the periodic loop. Returns `false` if it is already running.
    pub fn start(self: &Arc<Self>, interval: Duration) -> bool {
        let this = Arc::clone(self);
        self.ticker.start(interval, move || {
            let this = Arc::clone(&this);
            async move {
                this.run_cycle().await;
            }
        })
    }

    /// Stops the periodic loop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        self.ticker.stop()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }
}

//! # Example: boot
//!
//! Boots a primary kernel with the self-healing service and a toy mailer
//! plugin, feeds it a few leads and prints the topology before shutting down.
//!
//! Demonstrates how to:
//! - Install the `tracing` subscriber and trace the whole bus with [`LogWriter`].
//! - Register plugins and wire the domain listeners to a job queue.
//! - Drain queued jobs with a worker that honours the retry schedule.
//! - Read the topology and self-healing reports.
//!
//! ## Flow
//! ```text
//! Kernel::boot()
//!     ├─► kernel.booting
//!     ├─► mailer.init/start, self-healing.init/start
//!     ├─► kernel.online
//!     ├─► lead.created ×3 ─► LeadIntake ─► MemoryQueue ─► worker
//!     └─► Kernel::shutdown() (Ctrl-C or after 3s)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example boot --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use kernelvisor::{
    Event, EventKind, FailOutcome, HealthReport, Kernel, KernelConfig,
    KernelService, LeadPayload, LogWriter, MemoryCache, MemoryQueue, SelfHealingService,
    ServiceError, ServiceRef, install_domain_listeners,
};

/// Plugin whose health degrades every third check.
struct Mailer {
    checks: AtomicU32,
}

#[async_trait]
impl KernelService for Mailer {
    fn name(&self) -> &str {
        "mailer"
    }

    async fn init(&self) -> Result<(), ServiceError> {
        println!("[mailer] connecting to smtp relay");
        Ok(())
    }

    async fn start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        println!("[mailer] closing relay connection");
        Ok(())
    }

    async fn health(&self) -> Result<HealthReport, ServiceError> {
        let n = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        let report = if n % 3 == 0 {
            HealthReport::degraded()
        } else {
            HealthReport::online()
        };
        Ok(report.with_metrics(json!({ "checks": n })))
    }
}

/// Leases jobs and fails every first run, so each job is retried once.
async fn worker(queue: Arc<MemoryQueue>) {
    loop {
        let Some(lease) = queue.take_next().await else {
            tokio::time::sleep(Duration::from_millis(100)).await;
            continue;
        };
        if lease.run == 1 {
            match queue.fail(lease.id).await {
                Some(FailOutcome::Retry(delay)) => {
                    println!("[worker] job {} failed, retry in {delay:?}", lease.id)
                }
                Some(FailOutcome::Exhausted) => println!("[worker] job {} exhausted", lease.id),
                None => {}
            }
            continue;
        }
        println!("[worker] {} done: {}", lease.job.name, lease.job.payload);
        queue.complete(lease.id).await;
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    kernelvisor::telemetry::init();

    let mut cfg = KernelConfig::from_env()?;
    cfg.health_interval = Duration::from_secs(1);
    cfg.healing.queue_interval = Duration::from_millis(500);

    let kernel = Kernel::builder(cfg)
        .with_listener("*", Arc::new(LogWriter))
        .build();

    let queue = Arc::new(MemoryQueue::new());
    install_domain_listeners(kernel.bus(), queue.clone());

    let healing = SelfHealingService::new(
        kernel.config().healing.clone(),
        kernel.store().clone(),
        queue.clone(),
        Arc::new(MemoryCache::new()),
        kernel.bus().clone(),
    );
    let mailer = Arc::new(Mailer {
        checks: AtomicU32::new(0),
    });
    let plugins: Vec<ServiceRef> = vec![mailer as ServiceRef, healing.clone()];
    kernel.load_plugins(plugins).await?;

    let summary = kernel.boot().await?;
    println!("started: {:?}, failed: {:?}", summary.started, summary.failed);

    let drain = tokio::spawn(worker(queue.clone()));
    for (email, name) in [
        ("ada@example.com", "Ada"),
        ("grace@example.com", "Grace"),
        ("linus@example.com", "Linus"),
    ] {
        kernel
            .bus()
            .publish(Event::new(EventKind::LeadCreated(LeadPayload::new(email, name))));
    }
    kernel.bus().publish(Event::new(EventKind::UserLoggedIn {
        user_id: "admin-1".into(),
    }));

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(3)) => {}
        _ = tokio::signal::ctrl_c() => println!("interrupted"),
    }

    println!(
        "topology: {}",
        serde_json::to_string_pretty(&kernel.topology().await?)?
    );
    println!(
        "healing: {}",
        serde_json::to_string_pretty(&healing.report().await?)?
    );

    drain.abort();
    kernel.shutdown().await?;
    Ok(())
}

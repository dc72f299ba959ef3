//! # Domain event listeners.
//!
//! - [`LeadIntake`]: `lead.created` ─► enqueue `process-new-lead` (3 attempts,
//!   exponential backoff from 1s with equal jitter so a burst of failed leads
//!   does not retry in lockstep)
//! - [`LoginAudit`]: `user.logged_in` ─► info!
//!
//! Both are registered at once with [`install`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::error::HandlerError;
use crate::events::{Event, EventBus, EventKind, Listener, SubscriptionId};
use crate::policies::{JitterPolicy, RetryPolicy};
use crate::ports::{Job, JobQueue};

/// Job name enqueued for every new lead.
pub const PROCESS_NEW_LEAD: &str = "process-new-lead";

/// Pushes each new lead to the job queue so the publisher never waits on processing.
pub struct LeadIntake {
    queue: Arc<dyn JobQueue>,
    retry: RetryPolicy,
}

impl LeadIntake {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self {
            queue,
            retry: RetryPolicy::exponential(3, Duration::from_millis(1000))
                .with_jitter(JitterPolicy::Equal),
        }
    }

    /// Overrides the retry policy attached to enqueued jobs.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Listener for LeadIntake {
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        let EventKind::LeadCreated(lead) = &event.kind else {
            return Err(HandlerError::Unexpected(event.topic().into_owned()));
        };
        info!(email = %lead.email, "lead.created received");
        let job = Job::new(PROCESS_NEW_LEAD, json!(lead), self.retry);
        let id = self.queue.enqueue(job).await?;
        info!(job_id = id, "lead queued for processing");
        Ok(())
    }

    fn name(&self) -> &str {
        "lead-intake"
    }
}

/// Records admin logins.
pub struct LoginAudit;

#[async_trait]
impl Listener for LoginAudit {
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        if let EventKind::UserLoggedIn { user_id } = &event.kind {
            info!(user_id = %user_id, "user.logged_in received");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "login-audit"
    }
}

/// Subscribes [`LeadIntake`] and [`LoginAudit`] on `bus`.
pub fn install(bus: &EventBus, queue: Arc<dyn JobQueue>) -> [SubscriptionId; 2] {
    [
        bus.subscribe("lead.created", Arc::new(LeadIntake::new(queue))),
        bus.subscribe("user.logged_in", Arc::new(LoginAudit)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FailOutcome, Leased, MemoryQueue};
    use crate::events::LeadPayload;

    async fn wait_for_job(queue: &MemoryQueue) -> Leased {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if let Some(leased) = queue.take_next().await {
                    return leased;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("no job was enqueued")
    }

    #[tokio::test]
    async fn new_lead_is_queued_with_retry_policy() {
        let bus = EventBus::new();
        let queue = Arc::new(MemoryQueue::new());
        install(&bus, queue.clone());

        let mut lead = LeadPayload::new("ana@example.com", "Ana");
        lead.details = json!({ "treatment": "implant" });
        assert_eq!(bus.emit(EventKind::LeadCreated(lead)), 1);

        let leased = wait_for_job(&queue).await;
        assert_eq!(leased.job.name, PROCESS_NEW_LEAD);
        assert_eq!(leased.job.payload["email"], "ana@example.com");
        assert_eq!(leased.job.payload["details"]["treatment"], "implant");
        assert_eq!(leased.job.retry.attempts, 3);
        assert_eq!(leased.job.retry.backoff.jitter, JitterPolicy::Equal);

        // Third failed run exhausts the policy.
        let Some(FailOutcome::Retry(first)) = queue.fail(leased.id).await else {
            panic!("first failure should be retried");
        };
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_secs(1));
        let second = queue.take_next().await.unwrap();
        let Some(FailOutcome::Retry(next)) = queue.fail(second.id).await else {
            panic!("second failure should be retried");
        };
        assert!(next >= Duration::from_secs(1) && next <= Duration::from_secs(2));
        let third = queue.take_next().await.unwrap();
        assert_eq!(third.run, 3);
        assert_eq!(queue.fail(third.id).await, Some(FailOutcome::Exhausted));
    }

    #[tokio::test]
    async fn queue_outage_surfaces_as_port_error() {
        let queue = Arc::new(MemoryQueue::new());
        queue.set_unavailable(true);
        let intake = LeadIntake::new(queue);
        let ev = Event::new(EventKind::LeadCreated(LeadPayload::new("b@example.com", "Bo")));
        let err = intake.on_event(&ev).await.unwrap_err();
        assert_eq!(err.as_label(), "handler_port");
    }

    #[tokio::test]
    async fn intake_rejects_other_events() {
        let intake = LeadIntake::new(Arc::new(MemoryQueue::new()));
        let ev = Event::new(EventKind::UserLoggedIn { user_id: "u1".into() });
        assert!(matches!(
            intake.on_event(&ev).await,
            Err(HandlerError::Unexpected(_))
        ));
    }
}

//! # Kernel service (plugin) contract.
//!
//! A [`KernelService`] is a named unit with four lifecycle capabilities:
//! `init`, `start`, `stop` and `health`. Services are registered in the
//! [`ServiceRegistry`](crate::ServiceRegistry) before boot and live for the
//! whole process.
//!
//! ## Lifecycle
//! ```text
//! register ──► init() ──► start() ──► health() … health() ──► stop()
//!                 └─ Err ──┴─ Err ──► marked Failed, boot continues
//! ```
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use kernelvisor::{HealthReport, KernelService, ServiceError};
//!
//! struct Mailer;
//!
//! #[async_trait]
//! impl KernelService for Mailer {
//!     fn name(&self) -> &str { "mailer" }
//!     async fn init(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn start(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), ServiceError> { Ok(()) }
//!     async fn health(&self) -> Result<HealthReport, ServiceError> {
//!         Ok(HealthReport::online())
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ServiceError, panic_message};

/// Health reported by a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Online,
    Degraded,
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthStatus::Online => "ONLINE",
            HealthStatus::Degraded => "DEGRADED",
            HealthStatus::Offline => "OFFLINE",
        })
    }
}

/// Result of one health check: a status plus optional service-specific metrics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
}

impl HealthReport {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            metrics: None,
        }
    }

    #[inline]
    pub fn online() -> Self {
        Self::new(HealthStatus::Online)
    }

    #[inline]
    pub fn degraded() -> Self {
        Self::new(HealthStatus::Degraded)
    }

    #[inline]
    pub fn offline() -> Self {
        Self::new(HealthStatus::Offline)
    }

    /// Attaches service-specific metrics.
    pub fn with_metrics(mut self, metrics: Value) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// # Lifecycle contract for a kernel plugin.
///
/// Implementations should return errors instead of panicking. The registry
/// and the health supervisor isolate failures per service: an `Err` or a panic
/// from one service never stops the others from booting, shutting down or
/// being supervised.
#[async_trait]
pub trait KernelService: Send + Sync + 'static {
    /// Unique, stable service name.
    fn name(&self) -> &str;

    /// One-time preparation (subscriptions, connections). Called before [`start`](Self::start).
    async fn init(&self) -> Result<(), ServiceError>;

    /// Begins serving.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops serving. Must be safe to call even if `start` failed.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Reports current health.
    async fn health(&self) -> Result<HealthReport, ServiceError>;
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn KernelService>;

/// Awaits a lifecycle call, turning a panic into [`ServiceError::Panicked`].
pub(crate) async fn contain<T, F>(op: &'static str, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(ServiceError::Panicked {
            op,
            message: panic_message(&*panic),
        }),
    }
}

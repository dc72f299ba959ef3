//! Error types used by the kernel, its services and collaborators.
//!
//! - [`KernelError`]: errors raised by the kernel itself (registration, lifecycle).
//! - [`ServiceError`]: errors raised by a single [`KernelService`](crate::KernelService).
//! - [`PortError`]: failures of external collaborators (store, job queue, cache).
//! - [`HandlerError`]: failures returned by event listeners.
//! - [`ConfigError`]: invalid configuration input.
//!
//! Every enum provides `as_label` (short stable snake_case label for logs).
//! Only [`KernelError::DuplicateService`] is meant to abort startup; everything
//! else is absorbed and logged by the component that observes it.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the kernel runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum KernelError {
    /// A service with the same name is already registered (fatal configuration error).
    #[error("service {name} is already registered")]
    DuplicateService {
        /// Name that collided.
        name: String,
    },

    /// `boot()` called on a kernel that is already running.
    #[error("kernel already booted")]
    AlreadyBooted,

    /// `shutdown()` called on a kernel that was never booted.
    #[error("kernel is not running")]
    NotBooted,

    /// Registering OS signal listeners failed.
    #[error("failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

impl KernelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kernelvisor::KernelError;
    ///
    /// let err = KernelError::DuplicateService { name: "mailer".into() };
    /// assert_eq!(err.as_label(), "kernel_duplicate_service");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            KernelError::DuplicateService { .. } => "kernel_duplicate_service",
            KernelError::AlreadyBooted => "kernel_already_booted",
            KernelError::NotBooted => "kernel_not_booted",
            KernelError::Signal(_) => "kernel_signal",
        }
    }

    /// True for errors that must abort startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KernelError::DuplicateService { .. })
    }
}

/// # Errors produced by a kernel service.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// `init()` failed.
    #[error("init failed: {0}")]
    Init(String),

    /// `start()` failed.
    #[error("start failed: {0}")]
    Start(String),

    /// `stop()` failed.
    #[error("stop failed: {0}")]
    Stop(String),

    /// `health()` failed to produce a report.
    #[error("health check failed: {0}")]
    Health(String),

    /// `health()` did not answer in time.
    #[error("health check timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// A lifecycle call panicked; the panic was contained.
    #[error("{op} panicked: {message}")]
    Panicked {
        /// Lifecycle call that panicked (`"init"`, `"start"`, `"stop"`, `"health"`).
        op: &'static str,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kernelvisor::ServiceError;
    ///
    /// assert_eq!(ServiceError::Start("boom".into()).as_label(), "service_start");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Init(_) => "service_init",
            ServiceError::Start(_) => "service_start",
            ServiceError::Stop(_) => "service_stop",
            ServiceError::Health(_) => "service_health",
            ServiceError::Timeout { .. } => "service_health_timeout",
            ServiceError::Panicked { .. } => "service_panicked",
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// # Failures of external collaborators.
///
/// These are transient by contract: the caller logs them and the next
/// scheduled cycle retries implicitly.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Collaborator could not be reached.
    #[error("{port} unavailable: {reason}")]
    Unavailable {
        /// Which collaborator ("store", "queue", "cache").
        port: &'static str,
        /// Underlying message.
        reason: String,
    },

    /// Collaborator refused the operation.
    #[error("{port} rejected operation: {reason}")]
    Rejected {
        /// Which collaborator ("store", "queue", "cache").
        port: &'static str,
        /// Underlying message.
        reason: String,
    },
}

impl PortError {
    /// Shorthand for [`PortError::Unavailable`].
    pub fn unavailable(port: &'static str, reason: impl Into<String>) -> Self {
        PortError::Unavailable {
            port,
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PortError::Unavailable { .. } => "port_unavailable",
            PortError::Rejected { .. } => "port_rejected",
        }
    }
}

/// # Failure returned by an event listener.
///
/// The bus never propagates it to the publisher; it is logged per listener.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A collaborator call made by the listener failed.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The event did not carry what the listener expected.
    #[error("unexpected event: {0}")]
    Unexpected(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Port(_) => "handler_port",
            HandlerError::Unexpected(_) => "handler_unexpected_event",
            HandlerError::Other(_) => "handler_failed",
        }
    }
}

/// # Invalid configuration input.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// TOML document could not be parsed.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable held an unusable value.
    #[error("invalid value for {var}: {value:?}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

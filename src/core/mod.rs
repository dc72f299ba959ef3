//! Kernel core: services, lifecycle and supervision.
//!
//! The public entry point is [`Kernel`], built with [`KernelBuilder`], which
//! sequences boot and shutdown of every registered [`KernelService`].
//!
//! Internal modules:
//! - [`service`]: the plugin contract and health reports;
//! - [`registry`]: insertion-ordered catalogue, isolated start/stop;
//! - [`supervisor`]: periodic health polling into the store;
//! - [`gateway`]: replication of `kernel.*` events into the store;
//! - [`ticker`]: restartable periodic loop shared by the background pollers;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`kernel`]: the composition root.

mod builder;
mod gateway;
mod kernel;
mod registry;
mod service;
mod shutdown;
mod supervisor;
mod ticker;

pub use builder::KernelBuilder;
pub use gateway::EventGateway;
pub use kernel::{Kernel, ServiceView, TopologyReport};
pub use registry::{ServiceRegistry, ServiceState, StartSummary};
pub use service::{HealthReport, HealthStatus, KernelService, ServiceRef};
pub use supervisor::{CycleReport, HealthSupervisor};
pub(crate) use ticker::Ticker;

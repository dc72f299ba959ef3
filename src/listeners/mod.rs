//! Built-in bus listeners.
//!
//! - [`LeadIntake`] / [`LoginAudit`]: domain reactions to `lead.created` and
//!   `user.logged_in`, installed together by [`install_domain_listeners`].
//! - [`LogWriter`] (feature `logging`): traces every event it is subscribed to.
//!
//! Custom listeners implement [`Listener`](crate::Listener) or wrap a closure
//! in [`ListenerFn`](crate::ListenerFn).

mod domain;
#[cfg(feature = "logging")]
mod log;

pub use domain::{LeadIntake, LoginAudit, PROCESS_NEW_LEAD, install as install_domain_listeners};
#[cfg(feature = "logging")]
pub use log::LogWriter;

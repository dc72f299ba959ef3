//! # Termination signals.
//!
//! [`ShutdownSignal::wait`] resolves on the first termination request the
//! process receives and reports which one it was, so
//! [`Kernel::run_until_signal`](crate::Kernel::run_until_signal) can log it
//! before running the shutdown sequence.
//!
//! | Platform | Signals                         |
//! |----------|---------------------------------|
//! | Unix     | `SIGINT`, `SIGTERM`, `SIGQUIT`  |
//! | other    | Ctrl-C                          |

use std::fmt;

/// Termination request observed by the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    Quit,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
        })
    }
}

impl ShutdownSignal {
    /// Waits for the next termination request.
    ///
    /// Listeners are installed per call; an error means the OS refused one.
    #[cfg(unix)]
    pub async fn wait() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;

        let received = tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                ShutdownSignal::Interrupt
            }
            _ = term.recv() => ShutdownSignal::Terminate,
            _ = quit.recv() => ShutdownSignal::Quit,
        };
        Ok(received)
    }

    /// Waits for Ctrl-C.
    #[cfg(not(unix))]
    pub async fn wait() -> std::io::Result<Self> {
        tokio::signal::ctrl_c().await?;
        Ok(ShutdownSignal::Interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_display_as_posix_names() {
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
    }
}

//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGTERM and SIGINT handlers before serving starts
//! - Resolve to the name of the first signal received
//!
//! Handlers stay registered after the first signal, so later signals are
//! absorbed instead of killing the process mid-drain.

use std::io;

/// Registered termination signal handlers.
#[cfg(unix)]
pub struct Signals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    /// Register SIGTERM and SIGINT handlers.
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the first termination signal and return its name.
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Ctrl+C handler on platforms without Unix signals.
#[cfg(not(unix))]
pub struct Signals {
    _private: (),
}

#[cfg(not(unix))]
impl Signals {
    pub fn register() -> io::Result<Self> {
        Ok(Self { _private: () })
    }

    pub async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "signal_wait_failed");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}

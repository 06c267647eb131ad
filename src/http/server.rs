//! HTTP server: accept loop and graceful drain.
//!
//! # Responsibilities
//! - Accept connections and serve each on its own task
//! - Keep accepting through per-connection failures, back off on exhaustion
//! - On the shutdown signal: flip readiness, stop accepting, tell every
//!   connection to finish its in-flight request, then drain within the window

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::Router;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::Config;
use crate::health::Readiness;
use crate::lifecycle::shutdown::{self, DrainOutcome, Shutdown};
use crate::net::{connection, AcceptError, ConnectionSettings, Listener};
use crate::observability::logging::TRANSPORT_TARGET;

/// Pause after an accept failure caused by resource exhaustion.
pub const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Why serving ended with an error.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
    #[error("shutdown timed out with {remaining} connection(s) still open")]
    ForcedShutdown { remaining: usize },
}

/// HTTP server for the service router.
pub struct HttpServer {
    router: Router,
    settings: ConnectionSettings,
    shutdown_timeout: Duration,
    readiness: Readiness,
}

impl HttpServer {
    pub fn new(router: Router, config: &Config, readiness: Readiness) -> Self {
        Self {
            router,
            settings: ConnectionSettings {
                read_header_timeout: config.read_header_timeout,
                idle_timeout: config.idle_timeout,
            },
            shutdown_timeout: config.shutdown_timeout,
            readiness,
        }
    }

    /// Serve `listener` until `signal` resolves, then drain.
    ///
    /// `signal` resolves to the name of whatever asked for shutdown.
    pub async fn run<F>(self, listener: Listener, signal: F) -> Result<(), ServeError>
    where
        F: Future<Output = &'static str>,
    {
        let HttpServer {
            router,
            settings,
            shutdown_timeout,
            readiness,
        } = self;

        let shutdown = Shutdown::new();
        let mut connections = JoinSet::new();
        tokio::pin!(signal);

        let received = loop {
            tokio::select! {
                name = &mut signal => break name,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(
                            connection::serve(stream, peer, router.clone(), settings, shutdown.subscribe())
                                .in_current_span(),
                        );
                    }
                    Err(AcceptError::Connection(e)) => {
                        tracing::debug!(target: TRANSPORT_TARGET, error = %e, "accept_skipped");
                    }
                    Err(AcceptError::Exhausted(e)) => {
                        tracing::error!(
                            target: TRANSPORT_TARGET,
                            error = %e,
                            backoff = ?ACCEPT_BACKOFF,
                            "accept_backoff"
                        );
                        if let Some(name) = pause_unless(&mut signal, ACCEPT_BACKOFF).await {
                            break name;
                        }
                    }
                    Err(AcceptError::Fatal(e)) => return Err(ServeError::Accept(e)),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        tracing::info!(signal = received, "shutdown_signal_received");
        readiness.stop_accepting();
        drop(listener);
        shutdown.trigger();

        match shutdown::drain(&mut connections, shutdown_timeout).await {
            DrainOutcome::Complete => Ok(()),
            DrainOutcome::Forced { remaining } => Err(ServeError::ForcedShutdown { remaining }),
        }
    }
}

/// Wait out `delay` unless `signal` resolves first.
async fn pause_unless<S>(signal: &mut S, delay: Duration) -> Option<S::Output>
where
    S: Future + Unpin,
{
    tokio::select! {
        output = signal => Some(output),
        _ = tokio::time::sleep(delay) => None,
    }
}

//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the JSON logging subsystem at the configured level
//! - Report transport-level (hyper) errors through the same pipeline
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - One flattened JSON object per event on stdout
//! - Transport errors use a dedicated target so they can be filtered apart

use std::error::Error as _;
use std::fmt::Display;
use std::io;
use std::net::SocketAddr;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::LogLevel;

/// Target for errors raised below the handler chain (parsing, I/O, timeouts).
pub const TRANSPORT_TARGET: &str = "http_transport";

/// Install the global JSON subscriber.
pub fn init(level: LogLevel) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false),
        )
        .try_init()
}

/// Log an error reported by a connection's HTTP state machine.
///
/// Timeouts and half-sent requests from departing clients are routine and
/// go to debug; anything else is an error.
pub fn transport_error(connection: impl Display, peer: SocketAddr, error: &hyper::Error) {
    if is_routine(error) {
        tracing::debug!(
            target: TRANSPORT_TARGET,
            connection = %connection,
            peer = %peer,
            error = %error,
            "http_transport_closed"
        );
    } else {
        tracing::error!(
            target: TRANSPORT_TARGET,
            connection = %connection,
            peer = %peer,
            error = %error,
            "http_transport_error"
        );
    }
}

fn is_routine(error: &hyper::Error) -> bool {
    if error.is_timeout() || error.is_incomplete_message() {
        return true;
    }

    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// Log capture for assertions in unit tests.
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        /// Parsed JSON events, in emission order.
        pub fn events(&self) -> Vec<serde_json::Value> {
            self.contents()
                .lines()
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect()
        }

        /// Events whose message equals `message`.
        pub fn with_message(&self, message: &str) -> Vec<serde_json::Value> {
            self.events()
                .into_iter()
                .filter(|event| event["message"] == message)
                .collect()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Route this thread's events into a buffer until the guard drops.
    pub fn capture() -> (CapturedLogs, DefaultGuard) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(logs.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }
}

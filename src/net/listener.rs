//! TCP listener.
//!
//! # Responsibilities
//! - Bind to the configured `host:port`
//! - Accept incoming TCP connections
//! - Classify accept errors so the serve loop can skip, back off or stop

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

/// Error type for binding.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Failed `accept` call, classified by what the serve loop should do.
#[derive(Debug)]
pub enum AcceptError {
    /// The pending connection died before it was accepted. Skip it.
    Connection(io::Error),
    /// Out of descriptors, buffers or memory. Back off and retry.
    Exhausted(io::Error),
    /// The listener itself is broken.
    Fatal(io::Error),
}

impl AcceptError {
    fn classify(error: io::Error) -> Self {
        use io::ErrorKind::*;

        if matches!(
            error.kind(),
            ConnectionRefused | ConnectionAborted | ConnectionReset | Interrupted | WouldBlock
        ) {
            return AcceptError::Connection(error);
        }

        // EMFILE, ENFILE, ENOBUFS, ENOMEM
        match error.raw_os_error() {
            Some(12 | 23 | 24 | 105) => AcceptError::Exhausted(error),
            _ => AcceptError::Fatal(error),
        }
    }
}

/// `host:port`, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// A bound TCP listener.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to `host:port`. An empty host binds every interface.
    pub async fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let host = if host.is_empty() { "0.0.0.0" } else { host };
        let address = join_host_port(host, port);

        let inner = TcpListener::bind((host.trim_matches(|c| c == '[' || c == ']'), port))
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                source,
            })?;

        if let Ok(local) = inner.local_addr() {
            tracing::debug!(address = %local, "listener_bound");
        }

        Ok(Self { inner })
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), AcceptError> {
        self.inner.accept().await.map_err(AcceptError::classify)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_port_joining() {
        assert_eq!(join_host_port("127.0.0.1", 8080), "127.0.0.1:8080");
        assert_eq!(join_host_port("::1", 8080), "[::1]:8080");
        assert_eq!(join_host_port("[::1]", 80), "[::1]:80");
    }

    #[test]
    fn accept_errors_are_classified() {
        let reset = io::Error::from(io::ErrorKind::ConnectionAborted);
        assert!(matches!(AcceptError::classify(reset), AcceptError::Connection(_)));

        let emfile = io::Error::from_raw_os_error(24);
        assert!(matches!(AcceptError::classify(emfile), AcceptError::Exhausted(_)));

        let other = io::Error::new(io::ErrorKind::InvalidInput, "bad socket");
        assert!(matches!(AcceptError::classify(other), AcceptError::Fatal(_)));
    }

    #[tokio::test]
    async fn bind_reports_address_in_use() {
        let first = Listener::bind("127.0.0.1", 0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = match Listener::bind("127.0.0.1", port).await {
            Err(err) => err,
            Ok(_) => panic!("second bind on port {port} succeeded"),
        };
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }
}

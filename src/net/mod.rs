//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept, accept-error classification)
//!     → connection.rs (hyper HTTP/1.1, header/idle limits, drain on shutdown)
//!     → Hand off to the router
//! ```

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionSettings};
pub use listener::{AcceptError, Listener, ListenerError};

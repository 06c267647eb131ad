//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (resolve client IP through trusted proxies)
//!     → Access log
//! ```
//!
//! # Design Decisions
//! - No trust in client input: forwarding headers count only when the
//!   direct peer is a configured proxy

pub mod headers;

pub use headers::{InvalidProxy, TrustedProxies};

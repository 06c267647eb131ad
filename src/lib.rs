//! HTTP service template library.
//!
//! Built-in health, metrics and info endpoints, request identification,
//! panic recovery, structured access logging and graceful shutdown.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::Config;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

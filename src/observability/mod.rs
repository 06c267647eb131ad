//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request chain and lifecycle produce:
//!     → logging.rs (structured JSON log events, transport errors)
//!     → metrics.rs (counters, histograms, build info gauge)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape of /metrics)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows into every request log line
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use self::metrics::{Metrics, MetricsError};

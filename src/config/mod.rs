//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment variables
//!     → loader.rs (typed defaults, soft parse failures to stderr)
//!     → Config
//!     → validation.rs (aggregated semantic checks)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Every field has a default, so loading never fails
//! - Validation is a separate explicit step that reports all violations

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{BuildInfo, Config, LogLevel, Mode};
pub use validation::{ConfigError, ValidationError};

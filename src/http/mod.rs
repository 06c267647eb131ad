//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net)
//!     → server.rs (accept loop, per-connection tasks, drain)
//!     → middleware/ (request ID, panic recovery, access log + metrics, timeouts)
//!     → router.rs (built-in routes, 404 fallback)
//!     → response.rs (shared response helpers)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use request::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use response::HandlerErrors;
pub use router::{build_router, AppState, ServiceInfo};
pub use server::{HttpServer, ServeError};

//! Request middleware chain.
//!
//! # Order (outermost first)
//! ```text
//! request_id → recover_panics → access_log → write timeout → body read timeout → handler
//! ```
//!
//! The request ID stage is outermost so every later stage and the response
//! carry it. Recovery sits outside the access log so a panic is counted and
//! logged as a 500 before recovery turns it into the response.

pub mod access_log;
pub mod recovery;

use std::time::Duration;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

use crate::http::request;

pub use access_log::{AccessLog, UNMATCHED_ROUTE_LABEL};

/// Handler time limits applied inside the chain.
#[derive(Debug, Clone, Copy)]
pub struct HandlerTimeouts {
    /// Limit on reading the request body.
    pub read: Duration,
    /// Limit on producing the response.
    pub write: Duration,
}

/// Wrap `router` in the full middleware chain.
///
/// Layers added later run first, so the list below reads innermost first.
#[allow(deprecated)]
pub fn apply(router: Router, log: AccessLog, timeouts: HandlerTimeouts) -> Router {
    recovery::install_panic_hook();

    router
        .layer(RequestBodyTimeoutLayer::new(timeouts.read))
        .layer(TimeoutLayer::new(timeouts.write))
        .layer(from_fn_with_state(log, access_log::access_log))
        .layer(from_fn(recovery::recover_panics))
        .layer(from_fn(request::request_id))
}

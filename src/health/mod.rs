//! Liveness and readiness checks.
//!
//! - `/health` - Liveness: the process is up and serving HTTP
//! - `/ready` - Readiness: the process accepts new traffic (503 while draining)

pub mod state;

use axum::{extract::State, http::StatusCode};

pub use state::Readiness;

/// Liveness handler. If this responds, the process is alive.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness handler.
pub async fn readiness(State(readiness): State<Readiness>) -> StatusCode {
    if readiness.is_accepting() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

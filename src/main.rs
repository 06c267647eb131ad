//! HTTP service template.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ net::listener ──▶ net::connection (hyper HTTP/1.1)
//!                                        │
//!                                        ▼
//!                 request ID ─▶ recovery ─▶ access log + metrics ─▶ timeouts
//!                                        │
//!                                        ▼
//!                 /health  /ready  /metrics  /info  /   (404 otherwise)
//!
//!     Cross-cutting: config (env) · observability (JSON logs, Prometheus)
//!                    lifecycle (signals, readiness, drain)
//! ```
//!
//! Exits 0 after a clean drain and 1 on invalid configuration, a listen
//! failure or a drain that outlives the shutdown timeout.

use std::process::ExitCode;

use rust_axum_app::config::{BuildInfo, Config};
use rust_axum_app::lifecycle;
use rust_axum_app::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env(BuildInfo::compiled());

    if let Err(e) = logging::init(config.log_level) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

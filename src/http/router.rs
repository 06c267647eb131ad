//! Route table and built-in handlers.

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::Serialize;

use crate::config::{Config, Mode};
use crate::health::{self, Readiness};
use crate::http::middleware::{self, AccessLog, HandlerTimeouts};
use crate::observability::metrics::EXPOSITION_CONTENT_TYPE;
use crate::observability::Metrics;
use crate::security::TrustedProxies;

pub const LIVENESS_PATH: &str = "/health";
pub const READINESS_PATH: &str = "/ready";
pub const METRICS_PATH: &str = "/metrics";
pub const INFO_PATH: &str = "/info";
pub const ROOT_PATH: &str = "/";

/// Body of `GET /info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    #[serde(rename = "buildTime")]
    pub build_time: String,
}

impl ServiceInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service: config.service_name.clone(),
            version: config.version.clone(),
            build_time: config.build_time.clone(),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub info: Arc<ServiceInfo>,
    pub metrics: Arc<Metrics>,
    pub readiness: Readiness,
}

impl FromRef<AppState> for Readiness {
    fn from_ref(state: &AppState) -> Self {
        state.readiness.clone()
    }
}

/// Build the router with every route and the full middleware chain.
pub fn build_router(config: &Config, metrics: Arc<Metrics>, readiness: Readiness) -> Router {
    let proxies = match TrustedProxies::parse(&config.trusted_proxies) {
        Ok(proxies) => proxies,
        Err(e) => {
            tracing::error!(error = %e, "invalid_trusted_proxies");
            TrustedProxies::none()
        }
    };

    let state = AppState {
        info: Arc::new(ServiceInfo::from_config(config)),
        metrics: Arc::clone(&metrics),
        readiness,
    };

    let routes: [(&str, MethodRouter<AppState>); 5] = [
        (LIVENESS_PATH, get(health::liveness)),
        (READINESS_PATH, get(health::readiness)),
        (METRICS_PATH, get(metrics_handler)),
        (INFO_PATH, get(info_handler)),
        (ROOT_PATH, get(root_handler)),
    ];

    let debug = config.mode() == Mode::Debug;
    let mut router = Router::new();
    for (path, handler) in routes {
        if debug {
            tracing::info!(method = "GET", path, "route_registered");
        }
        router = router.route(path, handler);
    }

    let router = router.fallback(not_found).with_state(state);

    middleware::apply(
        router,
        AccessLog::new(config.service_name.as_str(), metrics, proxies),
        HandlerTimeouts {
            read: config.read_timeout,
            write: config.write_timeout,
        },
    )
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], state.metrics.render())
}

async fn info_handler(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(state.info.as_ref().clone())
}

async fn root_handler(State(state): State<AppState>) -> String {
    format!("{} is running (Rust + Axum)\n", state.info.service)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

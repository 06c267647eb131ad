//! Request metering and access logging.
//!
//! Runs after request identification and panic recovery, so it sees the
//! request ID and can observe a handler panic before recovery replaces it.
//! Every request is counted; health and scrape paths are not logged.

use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::header::USER_AGENT,
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;
use tracing::Level;

use super::recovery::panic_message;
use crate::http::request::RequestIdExt;
use crate::http::response::HandlerErrors;
use crate::http::router::{LIVENESS_PATH, METRICS_PATH, READINESS_PATH};
use crate::observability::Metrics;
use crate::security::TrustedProxies;

/// `path` label for requests that matched no route.
pub const UNMATCHED_ROUTE_LABEL: &str = "__unmatched__";

/// Paths that are metered but never logged.
pub const UNLOGGED_PATHS: [&str; 3] = [LIVENESS_PATH, READINESS_PATH, METRICS_PATH];

/// State for the access log stage.
#[derive(Clone)]
pub struct AccessLog {
    service: Arc<str>,
    metrics: Arc<Metrics>,
    proxies: Arc<TrustedProxies>,
}

impl AccessLog {
    pub fn new(service: impl Into<Arc<str>>, metrics: Arc<Metrics>, proxies: TrustedProxies) -> Self {
        Self {
            service: service.into(),
            metrics,
            proxies: Arc::new(proxies),
        }
    }
}

/// One `http_request` event.
struct RequestLine<'a> {
    status: u16,
    method: &'a str,
    path: &'a str,
    raw_path: &'a str,
    query: &'a str,
    ip: &'a str,
    latency: Duration,
    user_agent: &'a str,
    request_id: &'a str,
    errors: Option<String>,
}

macro_rules! request_event {
    ($level:expr, $line:expr) => {
        tracing::event!(
            $level,
            status = $line.status,
            method = $line.method,
            path = $line.path,
            raw_path = $line.raw_path,
            query = $line.query,
            ip = $line.ip,
            latency = ?$line.latency,
            user_agent = $line.user_agent,
            request_id = $line.request_id,
            errors = $line.errors.as_deref(),
            "http_request"
        )
    };
}

impl RequestLine<'_> {
    fn level(&self) -> Level {
        if self.status >= 500 {
            Level::ERROR
        } else if self.status >= 400 || self.errors.is_some() {
            Level::WARN
        } else {
            Level::INFO
        }
    }

    fn emit(&self) {
        match self.level() {
            Level::ERROR => request_event!(Level::ERROR, self),
            Level::WARN => request_event!(Level::WARN, self),
            _ => request_event!(Level::INFO, self),
        }
    }
}

/// `errors` field value: the messages as a JSON array, absent when empty.
fn errors_field(messages: &[String]) -> Option<String> {
    if messages.is_empty() {
        return None;
    }
    serde_json::to_string(messages).ok()
}

/// Middleware: record metrics for every request and log it.
pub async fn access_log(State(log): State<AccessLog>, request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let raw_path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE_LABEL.to_owned());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = log.proxies.client_ip(peer, request.headers());
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let request_id = request
        .request_id()
        .map(ToString::to_string)
        .unwrap_or_default();

    let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    let latency = start.elapsed();

    let (status, errors) = match &outcome {
        Ok(response) => (
            response.status().as_u16(),
            response
                .extensions()
                .get::<HandlerErrors>()
                .and_then(|errors| errors_field(errors.messages())),
        ),
        Err(payload) => (
            500,
            errors_field(&[format!("panic: {}", panic_message(payload.as_ref()))]),
        ),
    };

    log.metrics
        .record(&log.service, method.as_str(), &route, status, latency);

    if !UNLOGGED_PATHS.contains(&raw_path.as_str()) {
        RequestLine {
            status,
            method: method.as_str(),
            path: &route,
            raw_path: &raw_path,
            query: &query,
            ip: &ip,
            latency,
            user_agent: &user_agent,
            request_id: &request_id,
            errors,
        }
        .emit();
    }

    match outcome {
        Ok(response) => response,
        Err(payload) => panic::resume_unwind(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(status: u16, errors: Option<&str>) -> RequestLine<'static> {
        RequestLine {
            status,
            method: "GET",
            path: "/",
            raw_path: "/",
            query: "",
            ip: "",
            latency: Duration::ZERO,
            user_agent: "",
            request_id: "",
            errors: errors.map(str::to_owned),
        }
    }

    #[test]
    fn errors_render_as_a_json_array() {
        assert_eq!(errors_field(&[]), None);

        let messages = vec!["cache miss".to_string(), "retry; then \"give up\"".to_string()];
        let field = errors_field(&messages).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&field).unwrap();
        assert_eq!(parsed, messages);
    }

    #[test]
    fn level_follows_status_and_errors() {
        assert_eq!(line(200, None).level(), Level::INFO);
        assert_eq!(line(302, None).level(), Level::INFO);
        assert_eq!(line(200, Some("cache miss")).level(), Level::WARN);
        assert_eq!(line(404, None).level(), Level::WARN);
        assert_eq!(line(499, None).level(), Level::WARN);
        assert_eq!(line(500, None).level(), Level::ERROR);
        assert_eq!(line(503, Some("x")).level(), Level::ERROR);
    }
}

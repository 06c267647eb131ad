//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the service metrics (request count, latency, build info)
//! - Expose a Prometheus-compatible text rendering for `/metrics`
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by service, method, path, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `build_info` (gauge): always 1, labelled with service, version, build_time
//!
//! # Design Decisions
//! - Each `Metrics` owns its recorder; nothing is installed globally, so
//!   independent instances (one per test) never share counters
//! - Low-overhead metric updates (atomic operations)
//! - `path` is a route template or `__unmatched__`, never a raw client path

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::config::Config;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const BUILD_INFO: &str = "build_info";

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Histogram buckets tuned for typical web latencies (seconds).
pub const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Error type for metrics setup.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to build metrics recorder: {0}")]
    Build(#[from] BuildError),
}

/// Request metrics registry.
pub struct Metrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Metrics {
    /// Create the registry and publish `build_info` for this build.
    pub fn new(config: &Config) -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
                &LATENCY_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests processed.");
            describe_histogram!(
                HTTP_REQUEST_DURATION_SECONDS,
                Unit::Seconds,
                "HTTP request latencies in seconds."
            );
            describe_gauge!(BUILD_INFO, "Build information for the service.");

            gauge!(
                BUILD_INFO,
                "service" => config.service_name.clone(),
                "version" => config.version.clone(),
                "build_time" => config.build_time.clone()
            )
            .set(1.0);
        });

        Ok(Self { recorder, handle })
    }

    /// Count one request and observe its latency.
    pub fn record(&self, service: &str, method: &str, path: &str, status: u16, latency: Duration) {
        let labels = [
            ("service", service.to_string()),
            ("method", method.to_string()),
            ("path", path.to_string()),
            ("status", status.to_string()),
        ];

        metrics::with_local_recorder(&self.recorder, || {
            counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);
            histogram!(HTTP_REQUEST_DURATION_SECONDS, &labels).record(latency.as_secs_f64());
        });
    }

    /// Current state of every instrument in text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Read a sample value out of a text exposition.
///
/// Matches the first sample named `name` that carries every `key="value"`
/// pair in `labels`.
pub fn sample_value(exposition: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    exposition
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let (series, value) = line.rsplit_once(' ')?;
            let rest = series.strip_prefix(name)?;
            if !(rest.is_empty() || rest.starts_with('{')) {
                return None;
            }
            let matches = labels
                .iter()
                .all(|(key, val)| rest.contains(&format!("{key}=\"{val}\"")));
            matches.then(|| value.parse().ok()).flatten()
        })
        .next()
}

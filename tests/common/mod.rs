//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rust_axum_app::config::{BuildInfo, Config};
use rust_axum_app::health::Readiness;
use rust_axum_app::http::middleware::{self, AccessLog, HandlerTimeouts};
use rust_axum_app::http::{HttpServer, ServeError};
use rust_axum_app::net::Listener;
use rust_axum_app::observability::Metrics;
use rust_axum_app::security::TrustedProxies;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Config with short timeouts bound to loopback.
pub fn test_config() -> Config {
    let mut config = Config::with_build_info(BuildInfo {
        service_name: "itest".to_string(),
        version: "9.9.9".to_string(),
        build_time: "2024-06-01T12:00:00Z".to_string(),
    });
    config.mode = "test".to_string();
    config.host = "127.0.0.1".to_string();
    config.read_header_timeout = Duration::from_secs(2);
    config.idle_timeout = Duration::from_secs(5);
    config.shutdown_timeout = Duration::from_secs(2);
    config
}

/// Wrap custom routes in the production middleware chain.
#[allow(dead_code)]
pub fn with_chain(routes: Router, config: &Config) -> (Router, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new(config).unwrap());
    let router = middleware::apply(
        routes,
        AccessLog::new(config.service_name.as_str(), Arc::clone(&metrics), TrustedProxies::none()),
        HandlerTimeouts {
            read: config.read_timeout,
            write: config.write_timeout,
        },
    );
    (router, metrics)
}

/// A server running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub readiness: Readiness,
    trigger: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServeError>>,
}

impl TestServer {
    pub async fn start(router: Router, config: &Config) -> Self {
        let readiness = Readiness::new();
        let listener = Listener::bind("127.0.0.1", 0).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (trigger, signal) = oneshot::channel::<()>();
        let server = HttpServer::new(router, config, readiness.clone());
        let handle = tokio::spawn(server.run(listener, async move {
            let _ = signal.await;
            "SIGTERM"
        }));

        Self {
            addr,
            readiness,
            trigger: Some(trigger),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver the shutdown signal.
    pub fn signal(&mut self) {
        if let Some(trigger) = self.trigger.take() {
            let _ = trigger.send(());
        }
    }

    /// Wait for the serve loop to finish.
    pub async fn stopped(self) -> Result<(), ServeError> {
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
    }
}

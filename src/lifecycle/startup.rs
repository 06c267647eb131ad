//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Initialize subsystems in dependency order (metrics, router, listener)
//! - Serve until a termination signal, then drain
//! - Map every way the run can end to a logged outcome
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::future::Future;
use std::io;
use std::sync::Arc;

use tracing::Instrument;

use crate::config::{Config, ConfigError};
use crate::health::Readiness;
use crate::http::{build_router, HttpServer, ServeError};
use crate::lifecycle::signals::Signals;
use crate::net::{Listener, ListenerError};
use crate::observability::{Metrics, MetricsError};

/// Reasons the process exits unsuccessfully.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("metrics setup failed: {0}")]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Listen(#[from] ListenerError),
    #[error("failed to register signal handlers: {0}")]
    Signals(#[source] io::Error),
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Run the service until SIGTERM or SIGINT, then drain.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let signals = Signals::register().map_err(|e| {
        tracing::error!(error = %e, "signal_registration_failed");
        StartupError::Signals(e)
    })?;

    run_until(config, signals.recv()).await
}

/// Run the service until `signal` resolves, then drain.
pub async fn run_until<F>(config: Config, signal: F) -> Result<(), StartupError>
where
    F: Future<Output = &'static str>,
{
    let span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.version,
        build_time = %config.build_time,
    );

    serve(config, signal).instrument(span).await
}

async fn serve<F>(config: Config, signal: F) -> Result<(), StartupError>
where
    F: Future<Output = &'static str>,
{
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid_config");
        return Err(e.into());
    }

    let metrics = Metrics::new(&config).map_err(|e| {
        tracing::error!(error = %e, "metrics_setup_failed");
        StartupError::from(e)
    })?;

    let readiness = Readiness::new();
    let router = build_router(&config, Arc::new(metrics), readiness.clone());

    let listener = Listener::bind(&config.host, config.port_number())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "listen_error");
            StartupError::from(e)
        })?;

    let address = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default();
    tracing::info!(
        address = %address,
        mode = %config.mode(),
        log_level = %config.log_level,
        "starting_server"
    );

    let server = HttpServer::new(router, &config, readiness);
    match server.run(listener, signal).await {
        Ok(()) => {
            tracing::info!("server_shutdown_complete");
            Ok(())
        }
        Err(e @ ServeError::ForcedShutdown { .. }) => {
            tracing::error!(error = %e, "server_forced_shutdown");
            Err(e.into())
        }
        Err(e) => {
            tracing::error!(error = %e, "listen_error");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildInfo;
    use crate::observability::logging::capture::capture;
    use std::time::Duration;

    fn config() -> Config {
        let mut config = Config::with_build_info(BuildInfo {
            service_name: "svc".to_string(),
            version: "0.0.1".to_string(),
            build_time: "unknown".to_string(),
        });
        config.host = "127.0.0.1".to_string();
        config
    }

    #[tokio::test]
    async fn invalid_config_fails_before_binding() {
        let (logs, _guard) = capture();
        let mut config = config();
        config.port = "70000".to_string();
        config.read_timeout = Duration::ZERO;

        let err = run_until(config, std::future::pending()).await.unwrap_err();
        assert!(matches!(err, StartupError::Config(_)));

        let events = logs.with_message("invalid_config");
        assert_eq!(events.len(), 1);
        let message = events[0]["error"].as_str().unwrap();
        assert!(message.starts_with("config validation failed: "));
        assert!(message.contains("; "));
        assert!(logs.with_message("starting_server").is_empty());
    }

    #[tokio::test]
    async fn port_in_use_is_a_listen_error() {
        let (logs, _guard) = capture();
        let taken = Listener::bind("127.0.0.1", 0).await.unwrap();
        let mut config = config();
        config.port = taken.local_addr().unwrap().port().to_string();

        let err = run_until(config, std::future::pending()).await.unwrap_err();
        assert!(matches!(err, StartupError::Listen(_)));
        assert_eq!(logs.with_message("listen_error").len(), 1);
    }

    #[tokio::test]
    async fn immediate_signal_shuts_down_cleanly() {
        let (logs, _guard) = capture();
        let mut config = config();
        config.mode = "test".to_string();

        // Port 0 fails validation, so borrow a free port first.
        let spare = Listener::bind("127.0.0.1", 0).await.unwrap();
        config.port = spare.local_addr().unwrap().port().to_string();
        drop(spare);

        run_until(config, async { "SIGTERM" }).await.unwrap();

        let received = logs.with_message("shutdown_signal_received");
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["signal"], "SIGTERM");
        assert_eq!(logs.with_message("starting_server").len(), 1);
        assert_eq!(logs.with_message("server_shutdown_complete").len(), 1);
    }
}

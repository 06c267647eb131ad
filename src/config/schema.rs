//! Configuration schema definitions.
//!
//! `Config` keeps the mode and port exactly as they were supplied so that
//! validation can report the offending raw value. Everything else is typed
//! at load time.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::Level;

/// Root configuration for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Run mode as supplied (`release`, `debug` or `test`).
    pub mode: String,

    /// Interface to bind.
    pub host: String,

    /// TCP port as supplied; validated to be in `1..=65535`.
    pub port: String,

    /// Log verbosity threshold.
    pub log_level: LogLevel,

    /// Max time to read a request body.
    pub read_timeout: Duration,

    /// Max time to produce a response.
    pub write_timeout: Duration,

    /// Max time to read request headers.
    pub read_header_timeout: Duration,

    /// Max keep-alive idle time.
    pub idle_timeout: Duration,

    /// Max time to wait for in-flight requests on shutdown.
    pub shutdown_timeout: Duration,

    /// IPs and CIDR prefixes allowed to set forwarded-for headers.
    pub trusted_proxies: Vec<String>,

    pub service_name: String,
    pub version: String,
    pub build_time: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_build_info(BuildInfo::default())
    }
}

impl Config {
    /// Documented defaults carrying the given build identity.
    pub fn with_build_info(build: BuildInfo) -> Self {
        Self {
            mode: Mode::Release.as_str().to_string(),
            host: "0.0.0.0".to_string(),
            port: "8080".to_string(),
            log_level: LogLevel::Info,
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            read_header_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(120),
            shutdown_timeout: Duration::from_secs(5),
            trusted_proxies: Vec::new(),
            service_name: build.service_name,
            version: build.version,
            build_time: build.build_time,
        }
    }

    /// Parsed run mode. Falls back to release for unvalidated configs.
    pub fn mode(&self) -> Mode {
        self.mode.parse().unwrap_or(Mode::Release)
    }

    /// Parsed port. Zero for unvalidated configs.
    pub fn port_number(&self) -> u16 {
        self.port.trim().parse().unwrap_or(0)
    }
}

/// Service identity fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub service_name: String,
    pub version: String,
    pub build_time: String,
}

impl BuildInfo {
    /// Identity baked in by the build environment (`SERVICE_NAME`,
    /// `APP_VERSION`, `BUILD_TIME`).
    pub fn compiled() -> Self {
        Self {
            service_name: option_env!("SERVICE_NAME")
                .unwrap_or("rust-axum-app")
                .to_string(),
            version: option_env!("APP_VERSION")
                .unwrap_or(env!("CARGO_PKG_VERSION"))
                .to_string(),
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::compiled()
    }
}

/// Process-wide run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Release,
    Debug,
    Test,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Release, Mode::Debug, Mode::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Release => "release",
            Mode::Debug => "debug",
            Mode::Test => "test",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Log verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::with_build_info(BuildInfo {
            service_name: "svc".into(),
            version: "1.2.3".into(),
            build_time: "2025-01-01T00:00:00Z".into(),
        });

        assert_eq!(config.mode(), Mode::Release);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port_number(), 8080);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.read_header_timeout, Duration::from_secs(2));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert!(config.trusted_proxies.is_empty());
        assert_eq!(config.service_name, "svc");
        assert_eq!(config.version, "1.2.3");
        assert_eq!(config.build_time, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn mode_parsing_is_exact() {
        assert_eq!("debug".parse::<Mode>(), Ok(Mode::Debug));
        assert_eq!("test".parse::<Mode>(), Ok(Mode::Test));
        assert!("Release".parse::<Mode>().is_err());
        assert!("".parse::<Mode>().is_err());
    }
}

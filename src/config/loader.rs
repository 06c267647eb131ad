//! Configuration loading from the process environment.
//!
//! Loading never fails: a missing value takes its default silently, a
//! malformed value takes its default and prints a diagnostic to stderr
//! (the structured logger does not exist yet at this point).

use std::time::Duration;

use crate::config::schema::{BuildInfo, Config, LogLevel};

pub const ENV_MODE: &str = "APP_MODE";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_READ_TIMEOUT: &str = "READ_TIMEOUT";
pub const ENV_WRITE_TIMEOUT: &str = "WRITE_TIMEOUT";
pub const ENV_READ_HEADER_TIMEOUT: &str = "READ_HEADER_TIMEOUT";
pub const ENV_IDLE_TIMEOUT: &str = "IDLE_TIMEOUT";
pub const ENV_SHUTDOWN_TIMEOUT: &str = "SHUTDOWN_TIMEOUT";
pub const ENV_TRUSTED_PROXIES: &str = "TRUSTED_PROXIES";

/// Error type for duration parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("invalid duration")]
    Invalid,
    #[error("missing unit in duration")]
    MissingUnit,
    #[error("unknown unit {0:?} in duration")]
    UnknownUnit(String),
    #[error("negative durations are not supported")]
    Negative,
    #[error("duration out of range")]
    Overflow,
}

/// Unit suffixes and their length in nanoseconds.
const UNITS: [(&str, u128); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env(build: BuildInfo) -> Self {
        Self::from_lookup(build, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(build: BuildInfo, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::with_build_info(build);

        let mode = lookup(ENV_MODE)
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.mode);

        let host = lookup(ENV_HOST)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.host);

        let port = lookup(ENV_PORT)
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.port);

        let log_level = parse_log_level(lookup(ENV_LOG_LEVEL).as_deref().unwrap_or_default());

        let duration = |key: &str, default: Duration| {
            duration_or_default(key, lookup(key).as_deref(), default)
        };

        Config {
            mode,
            host,
            port,
            log_level,
            read_timeout: duration(ENV_READ_TIMEOUT, defaults.read_timeout),
            write_timeout: duration(ENV_WRITE_TIMEOUT, defaults.write_timeout),
            read_header_timeout: duration(ENV_READ_HEADER_TIMEOUT, defaults.read_header_timeout),
            idle_timeout: duration(ENV_IDLE_TIMEOUT, defaults.idle_timeout),
            shutdown_timeout: duration(ENV_SHUTDOWN_TIMEOUT, defaults.shutdown_timeout),
            trusted_proxies: parse_csv(lookup(ENV_TRUSTED_PROXIES).as_deref().unwrap_or_default()),
            service_name: defaults.service_name,
            version: defaults.version,
            build_time: defaults.build_time,
        }
    }
}

/// Map a level name to a `LogLevel`; unknown names fall back to info.
pub fn parse_log_level(raw: &str) -> LogLevel {
    match raw.trim().to_ascii_lowercase().as_str() {
        "debug" => LogLevel::Debug,
        "warn" | "warning" => LogLevel::Warn,
        "error" => LogLevel::Error,
        "info" | "" => LogLevel::Info,
        _ => {
            eprintln!("invalid {ENV_LOG_LEVEL}={raw:?}, defaulting to info");
            LogLevel::Info
        }
    }
}

fn duration_or_default(key: &str, raw: Option<&str>, default: Duration) -> Duration {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return default;
    }

    match parse_duration(value) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("invalid {key}={value:?}: {e}, using default {default:?}");
            default
        }
    }
}

/// Parse a duration such as `150ms`, `1m30s` or `1.5h`.
///
/// A bare `0` is accepted as zero; every other value needs a unit.
pub fn parse_duration(raw: &str) -> Result<Duration, DurationError> {
    let s = raw.trim();
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Invalid);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, tail) = rest.split_at(int_len);

        let (frac_part, tail) = match tail.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                after_dot.split_at(frac_len)
            }
            None => ("", tail),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DurationError::Invalid);
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit);
        }

        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| DurationError::Overflow)?
        };
        let mut nanos = whole.checked_mul(scale).ok_or(DurationError::Overflow)?;

        if !frac_part.is_empty() {
            // Anything past 18 digits is below nanosecond resolution.
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| DurationError::Invalid)?;
            nanos += frac * scale / 10u128.pow(digits.len() as u32);
        }

        total = total.checked_add(nanos).ok_or(DurationError::Overflow)?;
        rest = tail;
    }

    if negative && total > 0 {
        return Err(DurationError::Negative);
    }

    let nanos = u64::try_from(total).map_err(|_| DurationError::Overflow)?;
    Ok(Duration::from_nanos(nanos))
}

/// Split a comma-separated list, dropping blank entries.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Mode;
    use std::collections::HashMap;

    fn build() -> BuildInfo {
        BuildInfo {
            service_name: "rust-axum-app".into(),
            version: "1.2.3".into(),
            build_time: "2025-01-01T00:00:00Z".into(),
        }
    }

    fn load(vars: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(build(), |key| env.get(key).cloned())
    }

    #[test]
    fn log_level_mapping() {
        let cases = [
            ("debug", LogLevel::Debug),
            ("DEBUG", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("", LogLevel::Info),
            ("  Warn ", LogLevel::Warn),
            ("warning", LogLevel::Warn),
            ("error", LogLevel::Error),
            ("unknown", LogLevel::Info),
        ];

        for (input, want) in cases {
            assert_eq!(parse_log_level(input), want, "input {input:?}");
        }
    }

    #[test]
    fn go_style_durations() {
        assert_eq!(parse_duration("150ms"), Ok(Duration::from_millis(150)));
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration(".5s"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("250us"), Ok(Duration::from_micros(250)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
    }

    #[test]
    fn malformed_durations_are_rejected() {
        assert_eq!(parse_duration(""), Err(DurationError::Invalid));
        assert_eq!(parse_duration("not-a-duration"), Err(DurationError::Invalid));
        assert_eq!(parse_duration("10"), Err(DurationError::MissingUnit));
        assert_eq!(
            parse_duration("3d"),
            Err(DurationError::UnknownUnit("d".to_string()))
        );
        assert_eq!(parse_duration("-5s"), Err(DurationError::Negative));
        assert_eq!(parse_duration("."), Err(DurationError::Invalid));
    }

    #[test]
    fn malformed_or_empty_durations_fall_back_to_default() {
        let default = Duration::from_secs(3);
        for raw in ["", "   ", "not-a-duration", "5", "-1s", "1x"] {
            assert_eq!(
                duration_or_default("TEST_DURATION", Some(raw), default),
                default,
                "raw {raw:?}"
            );
        }
        assert_eq!(duration_or_default("TEST_DURATION", None, default), default);
        assert_eq!(
            duration_or_default("TEST_DURATION", Some("150ms"), default),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn load_defaults_when_unset() {
        let config = load(&[]);
        assert_eq!(config, Config::with_build_info(build()));
    }

    #[test]
    fn load_defaults_when_empty() {
        let config = load(&[
            (ENV_MODE, ""),
            (ENV_HOST, "  "),
            (ENV_PORT, ""),
            (ENV_LOG_LEVEL, ""),
            (ENV_READ_TIMEOUT, ""),
            (ENV_TRUSTED_PROXIES, " , "),
        ]);
        assert_eq!(config, Config::with_build_info(build()));
    }

    #[test]
    fn load_from_env() {
        let config = load(&[
            (ENV_MODE, "debug"),
            (ENV_HOST, "127.0.0.1"),
            (ENV_PORT, "9000"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_READ_TIMEOUT, "1s"),
            (ENV_WRITE_TIMEOUT, "2s"),
            (ENV_READ_HEADER_TIMEOUT, "500ms"),
            (ENV_IDLE_TIMEOUT, "10s"),
            (ENV_SHUTDOWN_TIMEOUT, "7s"),
            (ENV_TRUSTED_PROXIES, "10.0.0.0/8, 192.168.1.1,,"),
        ]);

        assert_eq!(config.mode(), Mode::Debug);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port_number(), 9000);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.read_header_timeout, Duration::from_millis(500));
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(7));
        assert_eq!(config.trusted_proxies, vec!["10.0.0.0/8", "192.168.1.1"]);
        assert_eq!(config.service_name, "rust-axum-app");
        assert_eq!(config.version, "1.2.3");
    }
}

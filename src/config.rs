use std::env;
use std::str::FromStr;
use tokio::time::Duration;
use tracing::info;

use crate::errors::ConfigError;

/// Path appended to `SERVER_BASE_URL` for every benchmark request.
pub const SAVE_PATH: &str = "/kanban/save";

pub const DEFAULT_RAMP_INCREMENT: usize = 10;
pub const DEFAULT_RAMP_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_WINDOW_DURATION: Duration = Duration::from_secs(5);
pub const DEFAULT_METRICS_PORT: u16 = 2112;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Benchmark configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_base_url: String,
    pub session_secret: String,
    pub ramp_increment: usize,
    pub ramp_interval: Duration,
    pub window_duration: Duration,
    pub metrics_port: u16,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// `SERVER_BASE_URL` and `SESSION_SECRET` are required; everything else
    /// falls back to the fixed benchmark schedule.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_base_url = required_var("SERVER_BASE_URL")?;
        if !server_base_url.starts_with("http://") && !server_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                var: "SERVER_BASE_URL",
                value: server_base_url,
                message: "must start with http:// or https://".to_string(),
            });
        }
        let server_base_url = server_base_url.trim_end_matches('/').to_string();

        let session_secret = required_var("SESSION_SECRET")?;

        let ramp_increment = match env::var("RAMP_INCREMENT") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "RAMP_INCREMENT",
                        value: raw,
                        message: "must be a positive integer".to_string(),
                    })
                }
            },
            Err(_) => DEFAULT_RAMP_INCREMENT,
        };

        let ramp_interval = duration_var("RAMP_INTERVAL", DEFAULT_RAMP_INTERVAL)?;
        let window_duration = duration_var("WINDOW_DURATION", DEFAULT_WINDOW_DURATION)?;

        let metrics_port = match env::var("METRICS_PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    var: "METRICS_PORT",
                    value: raw.clone(),
                    message: e.to_string(),
                })?,
            Err(_) => DEFAULT_METRICS_PORT,
        };

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) => match raw.trim().to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "LOG_FORMAT",
                        value: raw,
                        message: "expected 'text' or 'json'".to_string(),
                    })
                }
            },
            Err(_) => LogFormat::Text,
        };

        Ok(Config {
            server_base_url,
            session_secret,
            ramp_increment,
            ramp_interval,
            window_duration,
            metrics_port,
            log_format,
        })
    }

    /// Full URL every worker posts to.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.server_base_url, SAVE_PATH)
    }

    /// Logs the configuration summary. The session secret is never logged.
    pub fn log_summary(&self) {
        info!(
            endpoint = %self.endpoint(),
            ramp_increment = self.ramp_increment,
            ramp_interval_secs = self.ramp_interval.as_secs(),
            window_secs = self.window_duration.as_secs_f64(),
            metrics_port = self.metrics_port,
            "Starting benchmark"
        );
    }
}

fn required_var(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingVar { var }),
    }
}

fn duration_var(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let raw = match env::var(var) {
        Ok(raw) => raw,
        Err(_) => return Ok(default),
    };
    match parse_duration_string(&raw) {
        Ok(d) if !d.is_zero() => Ok(d),
        Ok(_) => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            message: "must be greater than zero".to_string(),
        }),
        Err(message) => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            message,
        }),
    }
}

/// Parses a duration string in the format "30s", "10m", "5h", "3d".
pub fn parse_duration_string(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let Some(unit_char) = s.chars().last() else {
        return Err("Duration string cannot be empty".to_string());
    };
    let value_str = &s[..s.len() - unit_char.len_utf8()];

    let value = u64::from_str(value_str)
        .map_err(|_| format!("Invalid numeric value in duration: '{}'", value_str))?;

    let secs = match unit_char {
        's' => Some(value),
        'm' => value.checked_mul(60),
        'h' => value.checked_mul(60 * 60),
        'd' => value.checked_mul(24 * 60 * 60),
        _ => {
            return Err(format!(
                "Unknown duration unit: '{}'. Use 's', 'm', 'h', or 'd'.",
                unit_char
            ))
        }
    };

    secs.map(Duration::from_secs)
        .ok_or_else(|| format!("Duration '{}' is too large", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod duration {
        use super::*;

        #[test]
        fn parse_seconds() {
            assert_eq!(parse_duration_string("5s").unwrap(), Duration::from_secs(5));
        }

        #[test]
        fn parse_minutes() {
            assert_eq!(
                parse_duration_string("10m").unwrap(),
                Duration::from_secs(600)
            );
        }

        #[test]
        fn parse_hours_and_days() {
            assert_eq!(parse_duration_string("2h").unwrap(), Duration::from_secs(7200));
            assert_eq!(
                parse_duration_string("1d").unwrap(),
                Duration::from_secs(86400)
            );
        }

        #[test]
        fn trims_whitespace() {
            assert_eq!(
                parse_duration_string("  10m  ").unwrap(),
                Duration::from_secs(600)
            );
        }

        #[test]
        fn empty_string_errors() {
            let err = parse_duration_string("   ").unwrap_err();
            assert!(err.contains("empty"), "error was: {}", err);
        }

        #[test]
        fn unknown_suffix_errors() {
            let err = parse_duration_string("10x").unwrap_err();
            assert!(err.contains("Unknown duration unit"), "error was: {}", err);
        }

        #[test]
        fn missing_number_errors() {
            let err = parse_duration_string("m").unwrap_err();
            assert!(err.contains("Invalid numeric value"), "error was: {}", err);
        }

        #[test]
        fn overflow_errors() {
            let err = parse_duration_string(&format!("{}d", u64::MAX)).unwrap_err();
            assert!(err.contains("too large"), "error was: {}", err);
        }
    }
}

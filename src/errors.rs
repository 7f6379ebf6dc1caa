//! Error types for the benchmark client.
//!
//! Startup problems are fatal and surface as [`BenchError`]. Failures of
//! individual benchmark requests never leave the worker loop; they are
//! classified with [`ErrorCategory`] for logging and the error counter.

use std::fmt;
use thiserror::Error;

/// Errors raised while reading configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} environment variable must be set")]
    MissingVar { var: &'static str },

    #[error("{var}: invalid value '{value}' - {message}")]
    InvalidValue {
        var: &'static str,
        value: String,
        message: String,
    },
}

/// Fatal errors that abort the process before or instead of steady state.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to serialize payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("metrics server error: {0}")]
    Server(#[from] hyper::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{task} task stopped: {reason}")]
    TaskStopped { task: &'static str, reason: String },
}

impl From<reqwest::Error> for BenchError {
    fn from(e: reqwest::Error) -> Self {
        BenchError::Client(e.to_string())
    }
}

/// Categories of transient request failures seen by workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request timed out
    TimeoutError,

    /// Connection refused, DNS failure, reset while sending
    NetworkError,

    /// The response body could not be read to completion
    BodyError,

    /// Anything else
    OtherError,
}

impl ErrorCategory {
    /// Categorize a reqwest error.
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            ErrorCategory::TimeoutError
        } else if error.is_connect() || error.is_request() {
            ErrorCategory::NetworkError
        } else if error.is_body() || error.is_decode() {
            ErrorCategory::BodyError
        } else {
            let error_msg = error.to_string().to_lowercase();
            if error_msg.contains("timeout") {
                ErrorCategory::TimeoutError
            } else if error_msg.contains("dns") || error_msg.contains("connection") {
                ErrorCategory::NetworkError
            } else {
                ErrorCategory::OtherError
            }
        }
    }

    /// Get the Prometheus label for this error category.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::TimeoutError => "timeout_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::BodyError => "body_error",
            ErrorCategory::OtherError => "other_error",
        }
    }

    pub fn all() -> [ErrorCategory; 4] {
        [
            ErrorCategory::TimeoutError,
            ErrorCategory::NetworkError,
            ErrorCategory::BodyError,
            ErrorCategory::OtherError,
        ]
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

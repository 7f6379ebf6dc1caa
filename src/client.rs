use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};

use crate::errors::BenchError;

/// Name of the cookie carrying the session secret.
pub const SESSION_COOKIE: &str = "session-secret";

/// Builds the default headers attached to every benchmark request.
pub fn default_headers(session_secret: &str) -> Result<HeaderMap, BenchError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut cookie = HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, session_secret))
        .map_err(|e| BenchError::Client(format!("invalid SESSION_SECRET for cookie: {}", e)))?;
    cookie.set_sensitive(true);
    headers.insert(COOKIE, cookie);

    Ok(headers)
}

/// Builds the single HTTP client shared by every worker.
///
/// No request timeout is set: a stalled endpoint stalls only the worker
/// waiting on it.
pub fn build_client(session_secret: &str) -> Result<reqwest::Client, BenchError> {
    let client = reqwest::Client::builder()
        .default_headers(default_headers(session_secret)?)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_json_content_type_and_cookie() {
        let headers = default_headers("abc123").unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[COOKIE], "session-secret=abc123");
        assert!(headers[COOKIE].is_sensitive());
    }

    #[test]
    fn control_characters_in_secret_are_rejected() {
        let err = default_headers("bad\nsecret").unwrap_err();
        assert!(matches!(err, BenchError::Client(_)));
    }
}

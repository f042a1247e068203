//! Error types for the Zscaler client
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;

/// ZIA error code returned while another admin holds the configuration lock
pub const EDIT_LOCK_NOT_AVAILABLE: &str = "EDIT_LOCK_NOT_AVAILABLE";

/// The main error type for the Zscaler client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}{}: {message}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // GraphQL Errors
    // ============================================================================
    #[error("GraphQL error: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    // ============================================================================
    // Data Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },
}

/// Error body returned by the ZIA API on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code (e.g. `DUPLICATE_ITEM`)
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Parse an error body, tolerating non-JSON payloads
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Classify a non-2xx response into an API error.
    ///
    /// The ZIA error body (`{"code": ..., "message": ...}`) is used when
    /// present; otherwise the raw body becomes the message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = ApiErrorBody::parse(body);
        let message = parsed.message.unwrap_or_else(|| {
            if body.is_empty() {
                default_status_message(status).to_string()
            } else {
                body.to_string()
            }
        });
        Self::Api {
            status,
            code: parsed.code,
            message,
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::RateLimited { .. } => Some(429),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for a 404 from the API
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for a 401 from the API
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Check if a request made with `method` is worth another attempt
    /// after failing with this error.
    ///
    /// Gateway errors are only retried for idempotent methods since the
    /// request may have been applied upstream. Rate limits and edit-lock
    /// conflicts mean nothing was applied.
    pub fn is_retryable(&self, method: &Method) -> bool {
        match self {
            Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Error::Api { status, code, .. } => match status {
                429 => true,
                409 => code.as_deref() == Some(EDIT_LOCK_NOT_AVAILABLE),
                502..=504 => is_idempotent(method),
                _ => false,
            },
            _ => false,
        }
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

fn default_status_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        409 => "Conflict",
        429 => "Too many requests",
        500 => "Internal server error",
        503 => "Service unavailable",
        _ => "Request failed",
    }
}

/// Result type alias for the Zscaler client
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("api_key");
        assert_eq!(err.to_string(), "Missing required config field: api_key");

        let err = Error::from_status(404, "");
        assert_eq!(err.to_string(), "API error 404: Not found");
    }

    #[test]
    fn test_from_status_parses_zia_body() {
        let err = Error::from_status(
            400,
            r#"{"code":"DUPLICATE_ITEM","message":"Name already in use"}"#,
        );
        assert_eq!(
            err.to_string(),
            "API error 400 (DUPLICATE_ITEM): Name already in use"
        );
        match err {
            Error::Api { status, code, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("DUPLICATE_ITEM"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_raw_body() {
        let err = Error::from_status(500, "upstream exploded");
        assert_eq!(err.to_string(), "API error 500: upstream exploded");
    }

    #[test]
    fn test_graphql_display() {
        let err = Error::GraphQl {
            messages: vec!["bad field".to_string(), "bad arg".to_string()],
        };
        assert_eq!(err.to_string(), "GraphQL error: bad field; bad arg");
    }

    #[test_case(Method::POST, 429, None, true ; "too many requests")]
    #[test_case(Method::GET, 503, None, true ; "get gateway error")]
    #[test_case(Method::DELETE, 502, None, true ; "delete gateway error")]
    #[test_case(Method::POST, 503, None, false ; "post gateway error")]
    #[test_case(Method::POST, 409, Some(EDIT_LOCK_NOT_AVAILABLE), true ; "post edit lock")]
    #[test_case(Method::PUT, 409, Some("DUPLICATE_ITEM"), false ; "plain conflict")]
    #[test_case(Method::GET, 500, None, false ; "internal error")]
    #[test_case(Method::GET, 400, None, false ; "bad request")]
    #[test_case(Method::GET, 401, None, false ; "unauthorized")]
    #[test_case(Method::GET, 404, None, false ; "not found")]
    fn test_is_retryable(method: Method, status: u16, code: Option<&str>, expected: bool) {
        let err = Error::Api {
            status,
            code: code.map(String::from),
            message: String::new(),
        };
        assert_eq!(err.is_retryable(&method), expected);
    }

    #[test]
    fn test_status_helpers() {
        assert!(Error::from_status(404, "").is_not_found());
        assert!(Error::from_status(401, "").is_unauthorized());
        assert_eq!(
            Error::RateLimited {
                retry_after_seconds: 1
            }
            .status(),
            Some(429)
        );
        assert_eq!(Error::config("x").status(), None);
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable(&Method::POST));
        assert!(!Error::config("test").is_retryable(&Method::GET));
    }
}

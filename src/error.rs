// Error handling module
// Defines the error type surfaced by every auth operation

use thiserror::Error;

use crate::http_client::HttpResponse;

/// Errors that can occur while talking to the auth backend
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// Server answered with a non-success status; carries the raw response
    #[error("HTTP error: {}", status_line(.0))]
    Status(HttpResponse),

    /// Request never produced a response (timeout, connection refused, ...)
    #[error("HTTP request failed ({kind}): {message}")]
    Transport { kind: &'static str, message: String },

    /// Credential payload cannot be form-encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Response body is not what we expected
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// HTTP status of the error response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Status(response) => Some(response.status),
            _ => None,
        }
    }

    /// Raw error response, if the server answered at all
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            AuthError::Status(response) => Some(response),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Transport {
            kind: classify(&e),
            message: e.to_string(),
        }
    }
}

fn status_line(response: &HttpResponse) -> String {
    format!("{} - {}", response.status, response.text())
}

/// Categorize a reqwest error for logs and error messages
pub(crate) fn classify(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_builder() {
        "builder_error"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

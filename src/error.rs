//! Error types for station-push
//!
//! Push outcomes (skips, rejections, transport failures) are values carried by
//! [`crate::types::PushResult`]. The errors here cover everything around the
//! push itself: configuration, input parsing and client construction.

use thiserror::Error;

/// Errors raised while loading configuration or input, or building the pusher
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration file: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse station payload: {0}")]
    ParseError(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Classification of a failed HTTP exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum TransportErrorKind {
    /// Request did not complete within the configured timeout
    Timeout,
    /// DNS, TCP or TLS failure while connecting
    Connect,
    /// Provider answered with a non-2xx status and no recognizable error
    HttpStatus(u16),
    /// Any other failure while sending or reading the response
    Request,
}

/// A network-level failure during submission
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn http_status(status: u16) -> Self {
        Self::new(
            TransportErrorKind::HttpStatus(status),
            format!("provider answered with HTTP {}", status),
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if let Some(status) = e.status() {
            TransportErrorKind::HttpStatus(status.as_u16())
        } else {
            TransportErrorKind::Request
        };
        Self::new(kind, e.to_string())
    }
}

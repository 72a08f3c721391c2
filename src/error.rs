// src/error.rs
// Standardized error types for the Ares Club client

use thiserror::Error;

/// Main error type for the client library
#[derive(Error, Debug)]
pub enum AresError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{}", status_message(*status, detail.as_deref()))]
    Status { status: u16, detail: Option<String> },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("realtime protocol error: {0}")]
    Protocol(String),

    #[error("realtime channel is not connected")]
    NotConnected,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Result using AresError
pub type Result<T> = std::result::Result<T, AresError>;

/// Coarse classification used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Fetch failures, dropped connections, undecodable responses
    Network,
    /// Rejected locally before anything is sent (see `ChatError::class`)
    Validation,
    /// Login rejected or request not authorized
    Auth,
}

impl AresError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AresError::Status { status, .. } if matches!(status, 401 | 403) => ErrorClass::Auth,
            _ => ErrorClass::Network,
        }
    }

    /// Server-provided detail message, if the backend sent one
    pub fn detail(&self) -> Option<&str> {
        match self {
            AresError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.class() == ErrorClass::Auth
    }
}

fn status_message(status: u16, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("server returned {status}: {detail}"),
        None => format!("server returned {status}"),
    }
}

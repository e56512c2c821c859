//! Error types for the remote store crate.
//!
//! These never leave the crate: the gateway logs them and degrades.

use thiserror::Error;

/// Result type alias for remote store operations.
pub type Result<T> = std::result::Result<T, RemoteStoreError>;

/// Errors that can occur while talking to the hosted store.
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the REST endpoint
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (bad payload shape, bad header value, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication error (missing or rejected key)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A write that should echo exactly one row echoed none
    #[error("No row returned from {0}")]
    NoRow(String),
}

impl RemoteStoreError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the store rejected the key.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Api { status, .. } => matches!(*status, 401 | 403),
            Self::Auth(_) => true,
            _ => false,
        }
    }

    /// True for unique, foreign-key and check violations.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                *status == 409 || message.starts_with("23") || message.contains("violates")
            }
            _ => false,
        }
    }
}

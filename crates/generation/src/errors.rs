//! Error types for the generation client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model answered, but not in the declared shape.
    #[error("Failed to parse {what} response: {message}")]
    Malformed { what: &'static str, message: String },

    /// Error body returned by the model endpoint
    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no candidates")]
    EmptyResponse,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    pub fn malformed(what: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<GenerationError> for qsleads_core::Error {
    fn from(error: GenerationError) -> Self {
        qsleads_core::Error::generation(error.to_string())
    }
}

//! Error types for the core crate.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the synchronizers and the generation contract.
///
/// Remote store failures never show up here: the gateway swallows them and
/// degrades to empty results.
#[derive(Debug, Error)]
pub enum Error {
    /// A form-required field is missing or a required reference does not resolve.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The generation service rejected the request or returned an unusable payload.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// True when the error was caused by caller input rather than a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Rejects blank form-required text fields.
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_required_field_is_rejected() {
        let err = require_text("firstName", "   ").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation error: firstName is required");
    }

    #[test]
    fn filled_required_field_passes() {
        assert!(require_text("name", "Acme").is_ok());
    }
}

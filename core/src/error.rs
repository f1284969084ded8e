//! Error types and handling for genconfig core

use thiserror::Error;

/// Result type alias for genconfig operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for genconfig core
#[derive(Error, Debug)]
pub enum Error {
    /// Config resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Errors raised while resolving a generate config
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A supplied value breaks its type or range contract
    #[error("Malformed value for field '{field}': {reason}")]
    MalformedField { field: String, reason: String },

    /// The tokenizer could not encode a stop string
    #[error("Failed to encode stop string {text:?}: {message}")]
    Conversion { text: String, message: String },

    /// A required field has no override, caller value or model default
    #[error("Unresolved required field: {field}")]
    UnresolvedRequiredField { field: String },
}

impl ResolveError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolveError::MalformedField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_messages() {
        let err = ResolveError::malformed("top_p", "must be between 0.0 and 1.0, got 1.5");
        assert_eq!(
            err.to_string(),
            "Malformed value for field 'top_p': must be between 0.0 and 1.0, got 1.5"
        );

        let err: Error = ResolveError::UnresolvedRequiredField {
            field: "max_new_tokens".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Resolve error: Unresolved required field: max_new_tokens"
        );
    }
}

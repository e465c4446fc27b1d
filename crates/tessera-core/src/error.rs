//! Unified error types shared across the Tessera crates.

use thiserror::Error;

/// Unified error type for Tessera.
///
/// Crate-local errors (such as the worker pool's `WorkerError`) convert
/// into this type at module boundaries.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Conflict error (e.g., duplicate registration)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TesseraError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for lookup failures.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for TesseraError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TesseraError::not_found("worker", "a").error_code(), "NOT_FOUND");
        assert_eq!(TesseraError::conflict("dup").error_code(), "CONFLICT");
        assert_eq!(TesseraError::configuration("bad").error_code(), "CONFIGURATION_ERROR");
        assert_eq!(TesseraError::internal("oops").error_code(), "INTERNAL_ERROR");
        assert_eq!(
            TesseraError::from(anyhow::anyhow!("wrapped")).error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_error_constructors() {
        let not_found = TesseraError::not_found("worker", "mailer");
        assert!(not_found.is_not_found());
        assert!(not_found.to_string().contains("mailer"));

        let conflict = TesseraError::conflict("duplicate collector");
        assert!(!conflict.is_not_found());
        assert!(conflict.to_string().contains("duplicate collector"));

        let configuration = TesseraError::configuration("attempts must be >= 1");
        assert!(configuration.to_string().contains("attempts must be >= 1"));
    }

    #[test]
    fn test_other_is_transparent() {
        let err = TesseraError::from(anyhow::anyhow!("database down"));
        assert_eq!(err.to_string(), "database down");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TesseraError::from(json_err);
        assert!(err.to_string().contains("JSON serialization error"));
    }
}

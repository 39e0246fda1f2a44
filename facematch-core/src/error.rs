//! # Error Handling
//!
//! Error types for FaceMatch operations.
//!
//! ## Error Classes
//!
//! 1. **Construction**: an embedding violates its shape or numeric invariant
//! 2. **Client**: caller-supplied parameters break the query contract
//! 3. **Service**: timeouts, missing events, configuration and IO failures
//!
//! Nothing in the core is fatal: the worst outcome is a rejected query or a
//! skipped ingestion item.

use thiserror::Error;

/// Result type alias for FaceMatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for FaceMatch
#[derive(Error, Debug)]
pub enum Error {
    // Embedding Errors
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid embedding component at index {index}: {message}")]
    InvalidValue { index: usize, message: String },

    // Query / Ingestion Errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Query timeout after {millis}ms")]
    QueryTimeout { millis: u64 },

    #[error("No index for event {event_id}")]
    EventNotFound { event_id: u64 },

    // System Errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {message}")]
    Io { message: String, source: std::io::Error },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Shorthand for a [`Error::Validation`]
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation { message: message.into() }
    }

    /// True when the caller sent something wrong; retrying the same input
    /// will fail the same way.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::DimensionMismatch { .. } | Error::InvalidValue { .. } | Error::Validation { .. }
        )
    }

    /// Get error code for monitoring and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Error::InvalidValue { .. } => "INVALID_VALUE",
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::QueryTimeout { .. } => "QUERY_TIMEOUT",
            Error::EventNotFound { .. } => "EVENT_NOT_FOUND",
            Error::Configuration { .. } => "CONFIG_ERROR",
            Error::Io { .. } => "IO_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Re-tag an embedding construction failure as a query validation error,
    /// keeping the original message.
    pub fn into_validation(self) -> Self {
        match self {
            Error::Validation { .. } => self,
            other if other.is_client_error() => Error::Validation { message: other.to_string() },
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Extension trait for adding context to results
pub trait ResultExt<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e {
            Error::Io { message, source } => Error::Io {
                message: format!("{}: {}", f(), message),
                source,
            },
            other => Error::Internal {
                message: format!("{}: {}", f(), other),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::DimensionMismatch { expected: 128, actual: 3 }.is_client_error());
        assert!(Error::validation("bad").is_client_error());
        assert!(!Error::QueryTimeout { millis: 10 }.is_client_error());
        assert!(!Error::EventNotFound { event_id: 1 }.is_client_error());
    }

    #[test]
    fn test_into_validation_keeps_message() {
        let err = Error::DimensionMismatch { expected: 128, actual: 127 }.into_validation();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("expected 128, got 127"));

        let timeout = Error::QueryTimeout { millis: 5 }.into_validation();
        assert_eq!(timeout.error_code(), "QUERY_TIMEOUT");
    }

    #[test]
    fn test_with_context_on_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let result: Result<()> = Err(io.into());
        let err = result.with_context(|| "reading catalog".to_string()).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().contains("reading catalog"));
    }
}

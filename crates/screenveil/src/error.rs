//! Error types for screenveil.
//!
//! This module defines all error types used throughout the screenveil crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for screenveil operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Service Errors ===
    /// The blur service is not reachable (stopped or channel closed).
    #[error("blur service is unavailable")]
    ServiceUnavailable,

    /// A request to the blur service timed out.
    #[error("request timed out: {operation}")]
    RequestTimeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// A detection source failed to start.
    #[error("failed to start detector '{name}': {message}")]
    DetectorStart {
        /// Name of the detection source.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for screenveil operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a request timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::RequestTimeout {
            operation: operation.into(),
        }
    }

    /// Create a detector start error.
    #[must_use]
    pub fn detector_start(name: &'static str, message: impl Into<String>) -> Self {
        Self::DetectorStart {
            name,
            message: message.into(),
        }
    }

    /// Check if this error indicates the service is unreachable.
    #[must_use]
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }

    /// Check if this error is a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ServiceUnavailable;
        assert_eq!(err.to_string(), "blur service is unavailable");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_error_is_service_unavailable() {
        assert!(Error::ServiceUnavailable.is_service_unavailable());
        assert!(!Error::internal("test").is_service_unavailable());
    }

    #[test]
    fn test_error_is_timeout() {
        assert!(Error::timeout("getState").is_timeout());
        assert!(!Error::ServiceUnavailable.is_timeout());
    }

    #[test]
    fn test_timeout_error_display() {
        let err = Error::timeout("toggleBlur request");
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("toggleBlur"));
    }

    #[test]
    fn test_detector_start_error_display() {
        let err = Error::detector_start("meeting-url", "channel closed");
        let msg = err.to_string();
        assert!(msg.contains("meeting-url"));
        assert!(msg.contains("channel closed"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid pattern".to_string(),
        };
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("/root/forbidden"));
    }
}

//! Error types module
//!
//! Every failure of the upload protocol is expressed as an [`AppError`] variant.
//! The variants map one-to-one onto the error kinds the protocol surfaces to callers
//! (`DigestComputationFailed`, `PayloadTooLarge`, `UnsupportedMediaType`,
//! `TicketExpired`, `IntegrityMismatch`, `TransferFailed`, `PersistenceError`,
//! `Unauthorized`) plus a handful of generic kinds.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.
//! Both `Database` and `Persistence` render as `PERSISTENCE_ERROR` on the wire.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like expired tickets
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PAYLOAD_TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Digest computation failed: {0}")]
    DigestComputationFailed(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Upload ticket expired: {0}")]
    TicketExpired(String),

    #[error("Integrity mismatch: {0}")]
    IntegrityMismatch(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    ObjectExists(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::DigestComputationFailed(_) => (
            422,
            "DIGEST_COMPUTATION_FAILED",
            true,
            Some("Re-read the file and compute the checksum again"),
            false,
            LogLevel::Warn,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce the file size below the configured limit"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedMediaType(_) => (
            415,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Upload a file with one of the allowed content types"),
            false,
            LogLevel::Debug,
        ),
        AppError::TicketExpired(_) => (
            410,
            "TICKET_EXPIRED",
            true,
            Some("Request a new upload ticket"),
            false,
            LogLevel::Debug,
        ),
        AppError::IntegrityMismatch(_) => (
            400,
            "INTEGRITY_MISMATCH",
            false,
            Some("Recompute the checksum from the file and upload again"),
            false,
            LogLevel::Warn,
        ),
        AppError::TransferFailed(_) => (
            502,
            "TRANSFER_FAILED",
            true,
            Some("Request a new upload ticket and retry the transfer"),
            false,
            LogLevel::Warn,
        ),
        #[cfg(feature = "sqlx")]
        AppError::Database(_) => (
            500,
            "PERSISTENCE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Persistence(_) => (
            500,
            "PERSISTENCE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Unauthenticated(_) => (
            401,
            "UNAUTHENTICATED",
            false,
            Some("Check the authentication token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            403,
            "UNAUTHORIZED",
            false,
            Some("Ask an organization administrator to perform this change"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::ObjectExists(_) => (
            409,
            "OBJECT_EXISTS",
            false,
            Some("Finalize the existing object or request a new upload ticket"),
            false,
            LogLevel::Warn,
        ),
        AppError::Storage(_) => (
            502,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::DigestComputationFailed(_) => "DigestComputationFailed",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::TicketExpired(_) => "TicketExpired",
            AppError::IntegrityMismatch(_) => "IntegrityMismatch",
            AppError::TransferFailed(_) => "TransferFailed",
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "PersistenceError",
            AppError::Persistence(_) => "PersistenceError",
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::ObjectExists(_) => "ObjectExists",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Rebuild an error from the machine-readable code of an error response.
    ///
    /// Unknown codes become `Internal` so callers never lose the message.
    pub fn from_error_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "DIGEST_COMPUTATION_FAILED" => AppError::DigestComputationFailed(message),
            "PAYLOAD_TOO_LARGE" => AppError::PayloadTooLarge(message),
            "UNSUPPORTED_MEDIA_TYPE" => AppError::UnsupportedMediaType(message),
            "TICKET_EXPIRED" => AppError::TicketExpired(message),
            "INTEGRITY_MISMATCH" => AppError::IntegrityMismatch(message),
            "TRANSFER_FAILED" => AppError::TransferFailed(message),
            "PERSISTENCE_ERROR" => AppError::Persistence(message),
            "UNAUTHENTICATED" => AppError::Unauthenticated(message),
            "UNAUTHORIZED" => AppError::Unauthorized(message),
            "INVALID_INPUT" => AppError::InvalidInput(message),
            "NOT_FOUND" => AppError::NotFound(message),
            "OBJECT_EXISTS" => AppError::ObjectExists(message),
            "STORAGE_ERROR" => AppError::Storage(message),
            _ => AppError::Internal(message),
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(_) => "Failed to save settings".to_string(),
            AppError::Persistence(_) => "Failed to save settings".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::DigestComputationFailed(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::UnsupportedMediaType(msg)
            | AppError::TicketExpired(msg)
            | AppError::IntegrityMismatch(msg)
            | AppError::TransferFailed(msg)
            | AppError::Unauthenticated(msg)
            | AppError::Unauthorized(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::ObjectExists(msg) => msg.clone(),
        }
    }
}

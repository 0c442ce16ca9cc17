//! Storage gateway abstraction
//!
//! This module defines the StorageGateway trait that all blob store backends implement.
//! The application server never moves payload bytes itself: it hands out capability
//! URLs and later asks the gateway what was stored.

use crate::StorageBackend;
use async_trait::async_trait;
use brandmark_core::models::{StoredObject, Visibility};
use brandmark_core::{AppError, ContentDigest};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid upload signature")]
    InvalidSignature,

    #[error("Upload URL expired")]
    SignatureExpired,

    #[error("Content digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Payload of {size} bytes exceeds max {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Upload does not match signed constraints: {0}")]
    ConstraintViolation(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::AlreadyExists(key) => {
                AppError::ObjectExists(format!("A different object is stored under {}", key))
            }
            StorageError::InvalidSignature => {
                AppError::Unauthorized("Invalid upload signature".to_string())
            }
            StorageError::SignatureExpired => {
                AppError::TicketExpired("Upload URL expired".to_string())
            }
            e @ StorageError::DigestMismatch { .. } => AppError::IntegrityMismatch(e.to_string()),
            e @ StorageError::TooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            StorageError::ConstraintViolation(msg) => AppError::InvalidInput(msg),
            StorageError::BackendError(msg) | StorageError::ConfigError(msg) => {
                AppError::Storage(msg)
            }
            StorageError::IoError(e) => AppError::Storage(e.to_string()),
        }
    }
}

/// Everything a single PUT is bound to by its capability URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutConstraints {
    /// Normalized MIME type the PUT must declare
    pub content_type: String,
    /// Digest the payload must hash to
    pub digest: ContentDigest,
    /// Upper bound on the stored size
    pub max_size: u64,
    /// Exact size the payload was declared with
    pub byte_size: u64,
    pub visibility: Visibility,
}

/// A capability URL for one PUT, with the headers the uploader must send.
#[derive(Debug, Clone)]
pub struct PresignedPut {
    pub url: String,
    pub expires_at: DateTime<Utc>,
    pub headers: BTreeMap<String, String>,
}

/// Storage gateway trait
///
/// Implemented by the S3 backend and by the filesystem backend used in development
/// and tests. Keys are generated by [`crate::keys::generate_object_key`].
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Issue a capability URL accepting exactly one PUT to `object_key`.
    async fn presigned_put_url(
        &self,
        object_key: &str,
        constraints: &PutConstraints,
        expires_in: Duration,
    ) -> StorageResult<PresignedPut>;

    /// Look up a stored object. `Ok(None)` when nothing has been written under the key.
    async fn stat(&self, object_key: &str) -> StorageResult<Option<StoredObject>>;

    /// URL under which a public object is served
    fn public_url(&self, object_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

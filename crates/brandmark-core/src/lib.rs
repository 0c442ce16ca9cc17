//! Brandmark Core Library
//!
//! This crate provides the domain models, error types, configuration, checksum
//! computation and upload validation shared by every Brandmark component.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use checksum::{ChecksumError, ContentDigest, DigestBuilder};
pub use config::{BaseConfig, Config, ServiceConfig, StorageConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use validation::{UploadValidationError, UploadValidator};

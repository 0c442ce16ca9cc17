//! Brandmark Storage Library
//!
//! This crate provides the storage gateway abstraction and its implementations:
//! an S3 backend and a local filesystem backend for development and tests.
//!
//! # Object key format
//!
//! Keys are owner-scoped and server-generated: `{purpose_prefix}/{owner_id}/{uuid}.{ext}`.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signer;
pub mod traits;

// Re-export commonly used types
pub use brandmark_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use factory::create_local_storage;
pub use factory::create_storage;
pub use keys::{generate_object_key, parse_object_key, ParsedKey};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{PresignedPut, PutConstraints, StorageError, StorageGateway, StorageResult};

//! Tessera Storage Library
//!
//! This crate provides the blob storage abstraction used by the media store,
//! with implementations for the local filesystem and S3-compatible object stores.
//!
//! # Key format
//!
//! Keys are backend-relative, `/`-separated paths such as
//! `avatars/042/42/avatar.jpg`. A "directory" is a key prefix: deleting or
//! listing `avatars/042/42` covers every key below it and nothing else.
//!
//! Keys must not contain `..`, backslashes or a leading `/`.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use tessera_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};

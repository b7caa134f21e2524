//! Storage abstraction trait
//!
//! This module defines the Storage trait that all blob storage backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// The media store talks to blob storage only through this trait, so the
/// physical backend (local disk, S3, ...) can be swapped without touching
/// callers. Keys are backend-relative paths; see the crate root documentation.
///
/// Deleting something that does not exist is not an error: `delete` and
/// `delete_directory` return `Ok(false)` in that case.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `path`, replacing any existing object. Returns the stored path.
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Read the object at `path`.
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Check whether an object exists at `path`.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Delete the object at `path`. Returns whether something was removed.
    async fn delete(&self, path: &str) -> StorageResult<bool>;

    /// Recursively delete everything below `directory`. Returns whether anything was removed.
    async fn delete_directory(&self, directory: &str) -> StorageResult<bool>;

    /// List every file below `directory`, recursively, as full keys in sorted order.
    ///
    /// A missing directory yields an empty list.
    async fn list_files(&self, directory: &str) -> StorageResult<Vec<String>>;

    /// Copy an object to a new key. Returns the destination path.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<String>;

    /// Publicly fetchable URL for `path`.
    fn public_url(&self, path: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

//! Tessera Core Library
//!
//! This crate provides the domain models, error types, configuration, shard path
//! rules and upload validation shared by every Tessera component.

pub mod config;
pub mod error;
pub mod models;
pub mod sharding;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use sharding::{build_path, shard, SHARD_COUNT};
pub use storage_types::StorageBackend;
// Note: Storage, StorageError, StorageResult live in the tessera-storage crate

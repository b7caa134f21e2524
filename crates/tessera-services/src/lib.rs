//! Tessera Services Layer
//!
//! Orchestration on top of the storage backends and the ledger: the media
//! store, the retention sweeper and the legacy path migrator.

pub mod locks;
pub mod media;
pub mod migration;
pub mod retention;

pub use locks::KeyedLocks;
pub use media::{MediaStore, OwnerPurge};
pub use migration::{LegacyPathMigrator, MigrationReport, PlannedMove};
pub use retention::{RetentionConfig, RetentionSweeper, SweepReport};
pub use tessera_storage::{
    create_storage, Storage, StorageBackend, StorageError, StorageResult,
};

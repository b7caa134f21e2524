use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_core::models::{MediaCollection, MediaRecord, NewMediaRecord, OwnerRef};
use tessera_core::AppError;

/// Result of replacing the occupant of a single-slot collection.
#[derive(Debug, Clone)]
pub struct SlotReplacement {
    /// The freshly inserted record.
    pub record: MediaRecord,
    /// Every row (live or trashed) that previously occupied the slot, now hard-deleted.
    pub displaced: Vec<MediaRecord>,
}

/// Media record ledger
///
/// Persists metadata for every stored file independently of where the file
/// physically lives. Soft-deleted ("trashed") rows keep their file until the
/// retention sweeper purges them.
///
/// Collection queries return records ordered by `order` ascending, then id.
#[async_trait]
pub trait MediaLedger: Send + Sync {
    /// Insert a new record.
    async fn create(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError>;

    /// Atomically hard-delete every row in the record's single-slot collection
    /// for its owner and insert the new record.
    async fn replace_single(&self, record: NewMediaRecord) -> Result<SlotReplacement, AppError>;

    async fn find(&self, id: i64) -> Result<Option<MediaRecord>, AppError>;

    /// The live record stored at `path`, if any.
    async fn find_live_by_path(&self, path: &str) -> Result<Option<MediaRecord>, AppError>;

    /// Live records of one owner's collection.
    async fn live_for(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError>;

    /// Soft-deleted records of one owner's collection.
    async fn trashed_for(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError>;

    /// Every record of an owner, live and trashed.
    async fn all_for_owner(&self, owner: OwnerRef) -> Result<Vec<MediaRecord>, AppError>;

    /// Next gallery position: max existing order (trashed rows included) + 1.
    async fn next_order(&self, owner: OwnerRef, collection: MediaCollection)
        -> Result<i32, AppError>;

    /// Soft-delete one record. Returns false if it was missing or already trashed.
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;

    /// Soft-delete every live record of a collection, returning the trashed rows.
    async fn soft_delete_collection(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError>;

    /// Soft-delete every live record of an owner, returning the trashed rows.
    async fn soft_delete_owner(&self, owner: OwnerRef) -> Result<Vec<MediaRecord>, AppError>;

    /// Undo a soft-delete. Returns the restored record, or None if there was
    /// no trashed record with that id.
    async fn restore(&self, id: i64) -> Result<Option<MediaRecord>, AppError>;

    /// Remove a row regardless of its state.
    async fn hard_delete(&self, id: i64) -> Result<bool, AppError>;

    /// Remove a row only if it is still trashed.
    async fn purge_trashed(&self, id: i64) -> Result<bool, AppError>;

    /// Remove every row of an owner. Returns the number of rows removed.
    async fn hard_delete_owner(&self, owner: OwnerRef) -> Result<u64, AppError>;

    /// Trashed rows soft-deleted before `cutoff`, ordered by id, starting
    /// after `after_id`.
    async fn list_trashed_before(
        &self,
        cutoff: DateTime<Utc>,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<MediaRecord>, AppError>;

    /// Point a record at a new path.
    async fn update_path(&self, id: i64, path: &str) -> Result<bool, AppError>;
}

//! Deletion, restore and purge operations of the media store.

use serde::Serialize;
use tessera_core::models::{MediaCollection, MediaRecord, OwnerRef, OwnerType};
use tessera_core::AppError;

use super::store::{ensure_owner_matches, MediaStore};

/// Outcome of permanently removing everything an owner has stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OwnerPurge {
    /// Ledger rows removed, live and trashed.
    pub records_removed: u64,
    /// Whether the owner directory existed and was removed.
    pub directory_removed: bool,
}

impl MediaStore {
    /// Recursively remove the `{type}/{shard}/{id}` directory of an owner,
    /// together with the owner's ledger rows.
    ///
    /// Idempotent: returns `Ok(true)` whether or not anything existed. Use
    /// [`MediaStore::force_delete_owner`] to learn what was removed.
    pub async fn delete_owner_media(
        &self,
        owner_type: OwnerType,
        owner_id: u64,
    ) -> Result<bool, AppError> {
        self.force_delete_owner(OwnerRef::new(owner_type, owner_id))
            .await?;
        Ok(true)
    }

    /// Soft-delete every live record of one collection.
    ///
    /// Files stay in place until the retention sweeper purges the records.
    #[tracing::instrument(skip(self), fields(owner = %owner, collection = %collection))]
    pub async fn clear_media_collection(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError> {
        ensure_owner_matches(owner, collection)?;

        let _guard = self.locks.lock(owner).await;

        let trashed = self.ledger.soft_delete_collection(owner, collection).await?;

        if collection == MediaCollection::Avatar && !trashed.is_empty() {
            self.point_avatar(owner.owner_id, None).await?;
        }

        tracing::info!(
            owner = %owner,
            collection = %collection,
            trashed = trashed.len(),
            "Media collection cleared"
        );

        Ok(trashed)
    }

    /// Soft-delete all live media of an owner (owner soft-delete cascade).
    #[tracing::instrument(skip(self), fields(owner = %owner))]
    pub async fn delete_owner(&self, owner: OwnerRef) -> Result<Vec<MediaRecord>, AppError> {
        let _guard = self.locks.lock(owner).await;

        let trashed = self.ledger.soft_delete_owner(owner).await?;

        if owner.owner_type == OwnerType::User
            && trashed
                .iter()
                .any(|r| r.collection == MediaCollection::Avatar)
        {
            self.point_avatar(owner.owner_id, None).await?;
        }

        tracing::info!(owner = %owner, trashed = trashed.len(), "Owner media soft-deleted");

        Ok(trashed)
    }

    /// Permanently remove an owner's files and ledger rows (owner hard-delete cascade).
    ///
    /// Storage goes first so the ledger never forgets a file that still exists.
    #[tracing::instrument(skip(self), fields(owner = %owner))]
    pub async fn force_delete_owner(&self, owner: OwnerRef) -> Result<OwnerPurge, AppError> {
        let _guard = self.locks.lock(owner).await;

        let directory = owner.directory();
        let directory_removed = self
            .storage
            .delete_directory(&directory)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, directory = %directory, "Owner directory delete failed");
                AppError::StorageDelete(e.to_string())
            })?;

        let records_removed = self.ledger.hard_delete_owner(owner).await?;

        if owner.owner_type == OwnerType::User {
            self.point_avatar(owner.owner_id, None).await?;
        }

        tracing::info!(
            owner = %owner,
            directory = %directory,
            directory_removed,
            records_removed,
            "Owner media permanently deleted"
        );

        Ok(OwnerPurge {
            records_removed,
            directory_removed,
        })
    }

    /// Permanently remove one record and its file, then the owner directory if
    /// nothing is left in it.
    ///
    /// Returns `Ok(false)` if the record does not exist.
    #[tracing::instrument(skip(self), fields(media_id = id))]
    pub async fn force_delete_media(&self, id: i64) -> Result<bool, AppError> {
        let owner = match self.ledger.find(id).await? {
            Some(record) => record.owner(),
            None => return Ok(false),
        };

        let _guard = self.locks.lock(owner).await;

        // Re-read under the lock.
        let record = match self.ledger.find(id).await? {
            Some(record) => record,
            None => return Ok(false),
        };

        let shared_path = record.is_trashed()
            && self
                .ledger
                .find_live_by_path(&record.path)
                .await?
                .is_some();
        if !shared_path {
            self.storage.delete(&record.path).await.map_err(|e| {
                tracing::error!(error = %e, path = %record.path, "Media file delete failed");
                AppError::StorageDelete(e.to_string())
            })?;
        }

        self.ledger.hard_delete(record.id).await?;

        if record.collection == MediaCollection::Avatar && record.is_live() {
            self.point_avatar(record.owner_id, None).await?;
        }

        self.remove_directory_if_empty(&owner.directory()).await;

        tracing::info!(
            media_id = record.id,
            owner = %owner,
            path = %record.path,
            "Media permanently deleted"
        );

        Ok(true)
    }

    /// Undo a soft-delete.
    ///
    /// Refused when the file has already been removed, or when a single-slot
    /// collection has been refilled in the meantime. Restoring a live record
    /// returns it unchanged.
    #[tracing::instrument(skip(self), fields(media_id = id))]
    pub async fn restore_media(&self, id: i64) -> Result<MediaRecord, AppError> {
        let owner = match self.ledger.find(id).await? {
            Some(record) => record.owner(),
            None => return Err(AppError::NotFound(format!("Media {}", id))),
        };

        let _guard = self.locks.lock(owner).await;

        let record = self
            .ledger
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {}", id)))?;

        if record.is_live() {
            return Ok(record);
        }

        let file_exists = self
            .storage
            .exists(&record.path)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        if !file_exists {
            return Err(AppError::NotFound(format!(
                "File {} of media {} no longer exists",
                record.path, id
            )));
        }

        if record.collection.is_single_slot()
            && !self
                .ledger
                .live_for(owner, record.collection)
                .await?
                .is_empty()
        {
            return Err(AppError::Conflict(format!(
                "{} of {} is already occupied",
                record.collection, owner
            )));
        }

        let restored = self
            .ledger
            .restore(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {}", id)))?;

        if restored.collection == MediaCollection::Avatar {
            self.point_avatar(restored.owner_id, Some(&restored.path))
                .await?;
        }

        tracing::info!(media_id = id, owner = %owner, path = %restored.path, "Media restored");

        Ok(restored)
    }

    /// Permanently remove a trashed record and its file.
    ///
    /// Returns `Ok(false)` if the record was restored or removed in the
    /// meantime. File delete failures surface as `StorageDelete` and leave the
    /// row in place for a later attempt.
    pub async fn purge_trashed(&self, record: &MediaRecord) -> Result<bool, AppError> {
        let owner = record.owner();
        let _guard = self.locks.lock(owner).await;

        match self.ledger.find(record.id).await? {
            Some(current) if current.is_trashed() => {}
            _ => return Ok(false),
        }

        // A live record may have reclaimed the path (same-extension replace).
        let path_in_use = self.ledger.find_live_by_path(&record.path).await?.is_some();
        if !path_in_use {
            self.storage.delete(&record.path).await.map_err(|e| {
                AppError::StorageDelete(format!("{}: {}", record.path, e))
            })?;
        }

        let purged = self.ledger.purge_trashed(record.id).await?;

        if purged {
            self.remove_directory_if_empty(&owner.directory()).await;
        }

        Ok(purged)
    }

    /// Remove a directory tree that no longer contains any file.
    pub(crate) async fn remove_directory_if_empty(&self, directory: &str) {
        match self.storage.list_files(directory).await {
            Ok(files) if files.is_empty() => {
                if let Err(e) = self.storage.delete_directory(directory).await {
                    tracing::warn!(error = %e, directory = %directory, "Failed to remove empty directory");
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, directory = %directory, "Failed to list directory");
            }
        }
    }
}

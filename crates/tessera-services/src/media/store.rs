use std::sync::Arc;

use tessera_core::models::{
    MediaCollection, MediaMetadata, MediaRecord, NewMediaRecord, OwnerRef, SizeVariant,
    UploadedFile,
};
use tessera_core::validation::validate_upload;
use tessera_core::{build_path, AppError};
use tessera_db::{AvatarPointers, MediaLedger};
use tessera_storage::Storage;
use uuid::Uuid;

use crate::locks::KeyedLocks;

/// Media store
///
/// Orchestrates file writes, replacements and deletions against the injected
/// blob storage backend and records every stored file in the ledger.
///
/// Files are always written before their ledger record is created, so a
/// failed write never leaves a record behind. Every mutating operation on an
/// owner holds that owner's lock for its whole duration.
#[derive(Clone)]
pub struct MediaStore {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) ledger: Arc<dyn MediaLedger>,
    pub(crate) avatars: Arc<dyn AvatarPointers>,
    pub(crate) locks: KeyedLocks<OwnerRef>,
}

impl MediaStore {
    pub fn new(
        storage: Arc<dyn Storage>,
        ledger: Arc<dyn MediaLedger>,
        avatars: Arc<dyn AvatarPointers>,
    ) -> Self {
        Self {
            storage,
            ledger,
            avatars,
            locks: KeyedLocks::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn ledger(&self) -> &Arc<dyn MediaLedger> {
        &self.ledger
    }

    pub fn avatars(&self) -> &Arc<dyn AvatarPointers> {
        &self.avatars
    }

    pub fn locks(&self) -> &KeyedLocks<OwnerRef> {
        &self.locks
    }

    /// Store a user's avatar as `avatars/{shard}/{id}/avatar.{ext}`.
    ///
    /// Every other file in the user's avatar directory is removed afterwards,
    /// along with the previous avatar records, and the user's avatar pointer is
    /// moved to the new path. The new file is written before anything old is
    /// removed, so a failed write leaves the previous avatar in place.
    #[tracing::instrument(skip(self, file), fields(owner_id = user_id, collection = "avatar"))]
    pub async fn upload_avatar(
        &self,
        user_id: u64,
        file: UploadedFile,
    ) -> Result<MediaRecord, AppError> {
        self.replace_single(OwnerRef::user(user_id), MediaCollection::Avatar, file)
            .await
    }

    /// Append a photo to a provider's portfolio.
    #[tracing::instrument(skip(self, file), fields(owner_id = provider_id, collection = "portfolio"))]
    pub async fn upload_portfolio_photo(
        &self,
        provider_id: u64,
        file: UploadedFile,
    ) -> Result<MediaRecord, AppError> {
        self.append(
            OwnerRef::provider(provider_id),
            MediaCollection::Portfolio,
            file,
        )
        .await
    }

    /// Store a service photo.
    ///
    /// The main photo is a single slot stored as `main.{ext}` directly in the
    /// service directory; gallery photos are appended below `gallery/`.
    #[tracing::instrument(skip(self, file), fields(owner_id = service_id))]
    pub async fn upload_service_photo(
        &self,
        service_id: u64,
        file: UploadedFile,
        is_main: bool,
    ) -> Result<MediaRecord, AppError> {
        let owner = OwnerRef::service(service_id);
        if is_main {
            self.replace_single(owner, MediaCollection::ServiceMain, file)
                .await
        } else {
            self.append(owner, MediaCollection::ServiceGallery, file)
                .await
        }
    }

    /// Append a photo to a review.
    #[tracing::instrument(skip(self, file), fields(owner_id = review_id, collection = "review"))]
    pub async fn upload_review_photo(
        &self,
        review_id: u64,
        file: UploadedFile,
    ) -> Result<MediaRecord, AppError> {
        self.append(OwnerRef::review(review_id), MediaCollection::Review, file)
            .await
    }

    /// Dispatch an upload by collection name.
    ///
    /// Unknown names and collections that do not belong to the owner's type
    /// are rejected with a validation error before anything is written.
    pub async fn add_media(
        &self,
        owner: OwnerRef,
        file: UploadedFile,
        collection: &str,
    ) -> Result<MediaRecord, AppError> {
        let collection: MediaCollection = collection.parse()?;
        ensure_owner_matches(owner, collection)?;

        match collection {
            MediaCollection::Avatar => self.upload_avatar(owner.owner_id, file).await,
            MediaCollection::Portfolio => self.upload_portfolio_photo(owner.owner_id, file).await,
            MediaCollection::ServiceMain => {
                self.upload_service_photo(owner.owner_id, file, true).await
            }
            MediaCollection::ServiceGallery => {
                self.upload_service_photo(owner.owner_id, file, false)
                    .await
            }
            MediaCollection::Review => self.upload_review_photo(owner.owner_id, file).await,
        }
    }

    /// Public URL of a stored path.
    ///
    /// Only the original is stored; other sizes are addressed through a
    /// `variant` query parameter that an image proxy resolves.
    pub fn get_url(&self, path: &str, size: SizeVariant) -> String {
        let url = self.storage.public_url(path);
        match size {
            SizeVariant::Original => url,
            other => format!("{}?variant={}", url, other.as_str()),
        }
    }

    /// Write a file into a single-slot collection, displacing whatever held it.
    async fn replace_single(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
        file: UploadedFile,
    ) -> Result<MediaRecord, AppError> {
        validate_upload(collection, &file)?;

        let _guard = self.locks.lock(owner).await;

        let directory = owner.directory();
        let stem = match collection {
            MediaCollection::Avatar => "avatar",
            _ => "main",
        };
        let path = format!("{}/{}.{}", directory, stem, file.extension());

        self.write(&path, &file).await?;

        let replacement = match self
            .ledger
            .replace_single(self.new_record(owner, collection, &path, &file, 0))
            .await
        {
            Ok(replacement) => replacement,
            Err(e) => {
                self.discard_unrecorded(&path).await;
                return Err(e);
            }
        };

        if collection == MediaCollection::Avatar {
            // The ledger swap is committed, so stale files go even if the
            // pointer update fails.
            let pointed = self.point_avatar(owner.owner_id, Some(&path)).await;
            if let Err(e) = &pointed {
                tracing::error!(
                    error = %e,
                    owner = %owner,
                    path = %path,
                    "Failed to update avatar pointer after replace"
                );
            }

            // The avatar directory holds nothing but the current avatar.
            match self.storage.list_files(&directory).await {
                Ok(files) => {
                    for stale in files.iter().filter(|f| **f != path) {
                        self.remove_stale_file(stale).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        directory = %directory,
                        "Failed to list avatar directory, stale files may remain"
                    );
                }
            }

            pointed?;
        } else {
            for displaced in replacement.displaced.iter().filter(|r| r.path != path) {
                self.remove_stale_file(&displaced.path).await;
            }
        }

        tracing::info!(
            owner = %owner,
            collection = %collection,
            path = %path,
            media_id = replacement.record.id,
            displaced = replacement.displaced.len(),
            "Single-slot media replaced"
        );

        Ok(replacement.record)
    }

    /// Append a file with a generated name to a multi-photo collection.
    async fn append(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
        file: UploadedFile,
    ) -> Result<MediaRecord, AppError> {
        validate_upload(collection, &file)?;

        let _guard = self.locks.lock(owner).await;

        let order = self.ledger.next_order(owner, collection).await?;
        let directory = build_path(
            collection.path_kind(),
            owner.owner_id,
            collection.subpath(),
        );
        let path = format!(
            "{}/{}.{}",
            directory,
            Uuid::new_v4().simple(),
            file.extension()
        );

        self.write(&path, &file).await?;

        let record = match self
            .ledger
            .create(self.new_record(owner, collection, &path, &file, order))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.discard_unrecorded(&path).await;
                return Err(e);
            }
        };

        tracing::info!(
            owner = %owner,
            collection = %collection,
            path = %path,
            media_id = record.id,
            order,
            "Media appended"
        );

        Ok(record)
    }

    fn new_record(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
        path: &str,
        file: &UploadedFile,
        order: i32,
    ) -> NewMediaRecord {
        NewMediaRecord {
            owner,
            collection,
            storage_backend: self.storage.backend_type(),
            path: path.to_string(),
            original_filename: file.original_filename.clone(),
            mime_type: file.content_type.clone(),
            size_bytes: file.size() as u64,
            order,
            metadata: MediaMetadata::new(),
        }
    }

    async fn write(&self, path: &str, file: &UploadedFile) -> Result<(), AppError> {
        self.storage
            .put(path, file.data.clone(), &file.content_type)
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(error = %e, path = %path, "Storage write failed");
                AppError::StorageWrite(e.to_string())
            })
    }

    /// Remove a freshly written file whose ledger insert failed, unless a live
    /// record already owns that path.
    async fn discard_unrecorded(&self, path: &str) {
        match self.ledger.find_live_by_path(path).await {
            Ok(None) => self.remove_stale_file(path).await,
            Ok(Some(_)) => {}
            Err(e) => {
                tracing::warn!(error = %e, path = %path, "Could not check ledger before discarding file");
            }
        }
    }

    /// Best-effort delete of a file no record points to any more.
    pub(crate) async fn remove_stale_file(&self, path: &str) {
        if let Err(e) = self.storage.delete(path).await {
            tracing::warn!(
                error = %e,
                path = %path,
                "Failed to delete stale file, continuing"
            );
        }
    }

    pub(crate) async fn point_avatar(
        &self,
        user_id: u64,
        path: Option<&str>,
    ) -> Result<(), AppError> {
        if !self.avatars.set_avatar(user_id, path).await? {
            tracing::warn!(user_id, "Avatar pointer not updated, user not found");
        }
        Ok(())
    }
}

pub(crate) fn ensure_owner_matches(
    owner: OwnerRef,
    collection: MediaCollection,
) -> Result<(), AppError> {
    if collection.owner_type() != owner.owner_type {
        return Err(AppError::Validation(format!(
            "Collection {} does not belong to owner type {}",
            collection, owner.owner_type
        )));
    }
    Ok(())
}

//! Owner-facing URL accessors built from the ledger.

use tessera_core::models::{MediaCollection, OwnerRef, SizeVariant};
use tessera_core::AppError;

use super::store::MediaStore;

impl MediaStore {
    /// URL of a user's live avatar.
    pub async fn avatar_url(
        &self,
        user_id: u64,
        size: SizeVariant,
    ) -> Result<Option<String>, AppError> {
        self.first_url(OwnerRef::user(user_id), MediaCollection::Avatar, size)
            .await
    }

    /// URL of a service's main photo.
    pub async fn main_photo_url(
        &self,
        service_id: u64,
        size: SizeVariant,
    ) -> Result<Option<String>, AppError> {
        self.first_url(
            OwnerRef::service(service_id),
            MediaCollection::ServiceMain,
            size,
        )
        .await
    }

    /// Gallery photo URLs of a service, in gallery order.
    pub async fn gallery_urls(
        &self,
        service_id: u64,
        size: SizeVariant,
    ) -> Result<Vec<String>, AppError> {
        self.urls(
            OwnerRef::service(service_id),
            MediaCollection::ServiceGallery,
            size,
        )
        .await
    }

    pub async fn portfolio_urls(
        &self,
        provider_id: u64,
        size: SizeVariant,
    ) -> Result<Vec<String>, AppError> {
        self.urls(
            OwnerRef::provider(provider_id),
            MediaCollection::Portfolio,
            size,
        )
        .await
    }

    pub async fn review_photo_urls(
        &self,
        review_id: u64,
        size: SizeVariant,
    ) -> Result<Vec<String>, AppError> {
        self.urls(OwnerRef::review(review_id), MediaCollection::Review, size)
            .await
    }

    async fn first_url(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
        size: SizeVariant,
    ) -> Result<Option<String>, AppError> {
        Ok(self
            .ledger
            .live_for(owner, collection)
            .await?
            .first()
            .map(|r| self.get_url(&r.path, size)))
    }

    async fn urls(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
        size: SizeVariant,
    ) -> Result<Vec<String>, AppError> {
        Ok(self
            .ledger
            .live_for(owner, collection)
            .await?
            .iter()
            .map(|r| self.get_url(&r.path, size))
            .collect())
    }
}

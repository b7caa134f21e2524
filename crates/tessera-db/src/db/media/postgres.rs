use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres};
use tessera_core::models::{
    MediaCollection, MediaMetadata, MediaRecord, NewMediaRecord, OwnerRef, OwnerType,
};
use tessera_core::{AppError, StorageBackend};
use uuid::Uuid;

use super::ledger::{MediaLedger, SlotReplacement};
use crate::db::{from_db_id, map_write_error, to_db_id};

/// Row type for the media table.
#[derive(Debug, sqlx::FromRow)]
pub struct MediaRow {
    pub id: i64,
    pub uuid: Uuid,
    pub owner_type: OwnerType,
    pub owner_id: i64,
    pub collection: MediaCollection,
    pub storage_backend: StorageBackend,
    pub path: String,
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub sort_order: i32,
    pub metadata: Json<MediaMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MediaRow {
    pub fn to_domain(self) -> Result<MediaRecord, AppError> {
        Ok(MediaRecord {
            id: self.id,
            uuid: self.uuid,
            owner_type: self.owner_type,
            owner_id: from_db_id(self.owner_id)?,
            collection: self.collection,
            storage_backend: self.storage_backend,
            path: self.path,
            original_filename: self.original_filename,
            mime_type: self.mime_type,
            size_bytes: u64::try_from(self.size_bytes).map_err(|_| {
                AppError::Internal(format!("Negative size for media {}", self.id))
            })?,
            order: self.sort_order,
            metadata: self.metadata.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

fn rows_to_domain(rows: Vec<MediaRow>) -> Result<Vec<MediaRecord>, AppError> {
    rows.into_iter().map(MediaRow::to_domain).collect()
}

async fn insert_row<'e, E>(executor: E, record: &NewMediaRecord) -> Result<MediaRow, AppError>
where
    E: PgExecutor<'e>,
{
    let size_bytes = i64::try_from(record.size_bytes)
        .map_err(|_| AppError::Validation(format!("Size {} is out of range", record.size_bytes)))?;

    sqlx::query_as::<Postgres, MediaRow>(
        r#"
        INSERT INTO media (
            uuid, owner_type, owner_id, collection, storage_backend, path,
            original_filename, mime_type, size_bytes, sort_order, metadata
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(record.owner.owner_type)
    .bind(to_db_id(record.owner.owner_id)?)
    .bind(record.collection)
    .bind(record.storage_backend)
    .bind(&record.path)
    .bind(&record.original_filename)
    .bind(&record.mime_type)
    .bind(size_bytes)
    .bind(record.order)
    .bind(Json(&record.metadata))
    .fetch_one(executor)
    .await
    .map_err(|e| map_write_error(e, &format!("Live media at {}", record.path)))
}

/// PostgreSQL media ledger.
#[derive(Clone)]
pub struct PgMediaLedger {
    pool: PgPool,
}

impl PgMediaLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MediaLedger for PgMediaLedger {
    #[tracing::instrument(skip(self, record), fields(db.table = "media", db.operation = "insert", owner = %record.owner, collection = %record.collection))]
    async fn create(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError> {
        insert_row(&self.pool, &record).await?.to_domain()
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "media", db.operation = "replace", owner = %record.owner, collection = %record.collection))]
    async fn replace_single(&self, record: NewMediaRecord) -> Result<SlotReplacement, AppError> {
        if !record.collection.is_single_slot() {
            return Err(AppError::Validation(format!(
                "{} is not a single-slot collection",
                record.collection
            )));
        }

        let mut tx = self.pool.begin().await?;

        let displaced: Vec<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            DELETE FROM media
            WHERE owner_type = $1 AND owner_id = $2 AND collection = $3
            RETURNING *
            "#,
        )
        .bind(record.owner.owner_type)
        .bind(to_db_id(record.owner.owner_id)?)
        .bind(record.collection)
        .fetch_all(&mut *tx)
        .await?;

        let inserted = insert_row(&mut *tx, &record).await?;

        tx.commit().await?;

        Ok(SlotReplacement {
            record: inserted.to_domain()?,
            displaced: rows_to_domain(displaced)?,
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %id))]
    async fn find(&self, id: i64) -> Result<Option<MediaRecord>, AppError> {
        let row: Option<MediaRow> =
            sqlx::query_as::<Postgres, MediaRow>("SELECT * FROM media WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(MediaRow::to_domain).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    async fn find_live_by_path(&self, path: &str) -> Result<Option<MediaRecord>, AppError> {
        let row: Option<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            "SELECT * FROM media WHERE path = $1 AND deleted_at IS NULL",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MediaRow::to_domain).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", owner = %owner, collection = %collection))]
    async fn live_for(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            SELECT * FROM media
            WHERE owner_type = $1 AND owner_id = $2 AND collection = $3 AND deleted_at IS NULL
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(owner.owner_type)
        .bind(to_db_id(owner.owner_id)?)
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", owner = %owner, collection = %collection))]
    async fn trashed_for(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            SELECT * FROM media
            WHERE owner_type = $1 AND owner_id = $2 AND collection = $3 AND deleted_at IS NOT NULL
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(owner.owner_type)
        .bind(to_db_id(owner.owner_id)?)
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", owner = %owner))]
    async fn all_for_owner(&self, owner: OwnerRef) -> Result<Vec<MediaRecord>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            SELECT * FROM media
            WHERE owner_type = $1 AND owner_id = $2
            ORDER BY collection ASC, sort_order ASC, id ASC
            "#,
        )
        .bind(owner.owner_type)
        .bind(to_db_id(owner.owner_id)?)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", owner = %owner, collection = %collection))]
    async fn next_order(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<i32, AppError> {
        let next: i32 = sqlx::query_scalar::<Postgres, i32>(
            r#"
            SELECT COALESCE(MAX(sort_order), 0) + 1 FROM media
            WHERE owner_type = $1 AND owner_id = $2 AND collection = $3
            "#,
        )
        .bind(owner.owner_type)
        .bind(to_db_id(owner.owner_id)?)
        .bind(collection)
        .fetch_one(&self.pool)
        .await?;

        Ok(next)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "soft_delete", db.record_id = %id))]
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let rows_affected = sqlx::query(
            "UPDATE media SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "soft_delete", owner = %owner, collection = %collection))]
    async fn soft_delete_collection(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            UPDATE media SET deleted_at = NOW(), updated_at = NOW()
            WHERE owner_type = $1 AND owner_id = $2 AND collection = $3 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(owner.owner_type)
        .bind(to_db_id(owner.owner_id)?)
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "soft_delete", owner = %owner))]
    async fn soft_delete_owner(&self, owner: OwnerRef) -> Result<Vec<MediaRecord>, AppError> {
        let rows: Vec<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            UPDATE media SET deleted_at = NOW(), updated_at = NOW()
            WHERE owner_type = $1 AND owner_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(owner.owner_type)
        .bind(to_db_id(owner.owner_id)?)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "restore", db.record_id = %id))]
    async fn restore(&self, id: i64) -> Result<Option<MediaRecord>, AppError> {
        let row: Option<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            UPDATE media SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("Live media occupying the slot of {}", id)))?;

        row.map(MediaRow::to_domain).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", db.record_id = %id))]
    async fn hard_delete(&self, id: i64) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", db.record_id = %id))]
    async fn purge_trashed(&self, id: i64) -> Result<bool, AppError> {
        let rows_affected =
            sqlx::query("DELETE FROM media WHERE id = $1 AND deleted_at IS NOT NULL")
                .bind(id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", owner = %owner))]
    async fn hard_delete_owner(&self, owner: OwnerRef) -> Result<u64, AppError> {
        let rows_affected = sqlx::query("DELETE FROM media WHERE owner_type = $1 AND owner_id = $2")
            .bind(owner.owner_type)
            .bind(to_db_id(owner.owner_id)?)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    async fn list_trashed_before(
        &self,
        cutoff: DateTime<Utc>,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<MediaRow> = sqlx::query_as::<Postgres, MediaRow>(
            r#"
            SELECT * FROM media
            WHERE deleted_at IS NOT NULL AND deleted_at < $1 AND id > $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(cutoff)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "update", db.record_id = %id))]
    async fn update_path(&self, id: i64, path: &str) -> Result<bool, AppError> {
        let rows_affected =
            sqlx::query("UPDATE media SET path = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(path)
                .execute(&self.pool)
                .await
                .map_err(|e| map_write_error(e, &format!("Live media at {}", path)))?
                .rows_affected();

        Ok(rows_affected > 0)
    }
}

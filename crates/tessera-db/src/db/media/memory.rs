use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tessera_core::models::{MediaCollection, MediaRecord, NewMediaRecord, OwnerRef};
use tessera_core::AppError;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ledger::{MediaLedger, SlotReplacement};

#[derive(Default)]
struct LedgerState {
    last_id: i64,
    rows: BTreeMap<i64, MediaRecord>,
}

impl LedgerState {
    /// Same constraints as the partial unique indexes of the media table.
    fn check_live_conflicts(
        &self,
        candidate_id: Option<i64>,
        owner: OwnerRef,
        collection: MediaCollection,
        path: &str,
    ) -> Result<(), AppError> {
        let others = self
            .rows
            .values()
            .filter(|r| r.is_live() && Some(r.id) != candidate_id);

        for other in others {
            if other.path == path {
                return Err(AppError::Conflict(format!(
                    "Live media at {} already exists",
                    path
                )));
            }
            if collection.is_single_slot()
                && other.collection == collection
                && other.owner() == owner
            {
                return Err(AppError::Conflict(format!(
                    "Live {} for {} already exists",
                    collection, owner
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, record: NewMediaRecord) -> Result<MediaRecord, AppError> {
        self.check_live_conflicts(None, record.owner, record.collection, &record.path)?;

        self.last_id += 1;
        let now = Utc::now();
        let row = MediaRecord {
            id: self.last_id,
            uuid: Uuid::new_v4(),
            owner_type: record.owner.owner_type,
            owner_id: record.owner.owner_id,
            collection: record.collection,
            storage_backend: record.storage_backend,
            path: record.path,
            original_filename: record.original_filename,
            mime_type: record.mime_type,
            size_bytes: record.size_bytes,
            order: record.order,
            metadata: record.metadata,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    fn select<F>(&self, predicate: F) -> Vec<MediaRecord>
    where
        F: Fn(&MediaRecord) -> bool,
    {
        let mut rows: Vec<MediaRecord> = self
            .rows
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.order, r.id));
        rows
    }

    fn trash_where<F>(&mut self, predicate: F) -> Vec<MediaRecord>
    where
        F: Fn(&MediaRecord) -> bool,
    {
        let now = Utc::now();
        let mut trashed = Vec::new();
        for row in self.rows.values_mut() {
            if row.is_live() && predicate(row) {
                row.deleted_at = Some(now);
                row.updated_at = now;
                trashed.push(row.clone());
            }
        }
        trashed
    }
}

/// In-memory media ledger for tests and local tooling.
///
/// Enforces the same live-path and single-slot uniqueness rules as the
/// PostgreSQL schema.
#[derive(Clone, Default)]
pub struct InMemoryMediaLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryMediaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the soft-delete timestamp of a row.
    pub async fn set_deleted_at(&self, id: i64, deleted_at: Option<DateTime<Utc>>) -> bool {
        let mut state = self.state.lock().await;
        match state.rows.get_mut(&id) {
            Some(row) => {
                row.deleted_at = deleted_at;
                true
            }
            None => false,
        }
    }

    /// Number of rows, live and trashed.
    pub async fn len(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MediaLedger for InMemoryMediaLedger {
    async fn create(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError> {
        self.state.lock().await.insert(record)
    }

    async fn replace_single(&self, record: NewMediaRecord) -> Result<SlotReplacement, AppError> {
        if !record.collection.is_single_slot() {
            return Err(AppError::Validation(format!(
                "{} is not a single-slot collection",
                record.collection
            )));
        }

        let mut state = self.state.lock().await;
        let owner = record.owner;
        let collection = record.collection;

        let displaced_ids: Vec<i64> = state
            .rows
            .values()
            .filter(|r| r.owner() == owner && r.collection == collection)
            .map(|r| r.id)
            .collect();

        let displaced: Vec<MediaRecord> = displaced_ids
            .iter()
            .filter_map(|id| state.rows.remove(id))
            .collect();

        match state.insert(record) {
            Ok(inserted) => Ok(SlotReplacement {
                record: inserted,
                displaced,
            }),
            Err(e) => {
                // Roll back the deletes.
                for row in displaced {
                    state.rows.insert(row.id, row);
                }
                Err(e)
            }
        }
    }

    async fn find(&self, id: i64) -> Result<Option<MediaRecord>, AppError> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn find_live_by_path(&self, path: &str) -> Result<Option<MediaRecord>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .rows
            .values()
            .find(|r| r.is_live() && r.path == path)
            .cloned())
    }

    async fn live_for(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .select(|r| r.is_live() && r.owner() == owner && r.collection == collection))
    }

    async fn trashed_for(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .select(|r| r.is_trashed() && r.owner() == owner && r.collection == collection))
    }

    async fn all_for_owner(&self, owner: OwnerRef) -> Result<Vec<MediaRecord>, AppError> {
        let mut rows = self.state.lock().await.select(|r| r.owner() == owner);
        rows.sort_by_key(|r| (r.collection.as_str(), r.order, r.id));
        Ok(rows)
    }

    async fn next_order(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<i32, AppError> {
        let state = self.state.lock().await;
        let max = state
            .rows
            .values()
            .filter(|r| r.owner() == owner && r.collection == collection)
            .map(|r| r.order)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let trashed = self.state.lock().await.trash_where(|r| r.id == id);
        Ok(!trashed.is_empty())
    }

    async fn soft_delete_collection(
        &self,
        owner: OwnerRef,
        collection: MediaCollection,
    ) -> Result<Vec<MediaRecord>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .trash_where(|r| r.owner() == owner && r.collection == collection))
    }

    async fn soft_delete_owner(&self, owner: OwnerRef) -> Result<Vec<MediaRecord>, AppError> {
        Ok(self.state.lock().await.trash_where(|r| r.owner() == owner))
    }

    async fn restore(&self, id: i64) -> Result<Option<MediaRecord>, AppError> {
        let mut state = self.state.lock().await;

        let (owner, collection, path) = match state.rows.get(&id) {
            Some(row) if row.is_trashed() => (row.owner(), row.collection, row.path.clone()),
            _ => return Ok(None),
        };

        state
            .check_live_conflicts(Some(id), owner, collection, &path)
            .map_err(|_| {
                AppError::Conflict(format!("Live media occupying the slot of {} already exists", id))
            })?;

        Ok(state.rows.get_mut(&id).map(|row| {
            row.deleted_at = None;
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn hard_delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.state.lock().await.rows.remove(&id).is_some())
    }

    async fn purge_trashed(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        match state.rows.get(&id) {
            Some(row) if row.is_trashed() => Ok(state.rows.remove(&id).is_some()),
            _ => Ok(false),
        }
    }

    async fn hard_delete_owner(&self, owner: OwnerRef) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        let before = state.rows.len();
        state.rows.retain(|_, r| r.owner() != owner);
        Ok((before - state.rows.len()) as u64)
    }

    async fn list_trashed_before(
        &self,
        cutoff: DateTime<Utc>,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .range(after_id.saturating_add(1)..)
            .map(|(_, r)| r)
            .filter(|r| r.deleted_at.is_some_and(|at| at < cutoff))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_path(&self, id: i64, path: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;

        let (owner, collection, live) = match state.rows.get(&id) {
            Some(row) => (row.owner(), row.collection, row.is_live()),
            None => return Ok(false),
        };

        if live {
            state.check_live_conflicts(Some(id), owner, collection, path)?;
        }

        Ok(state.rows.get_mut(&id).map_or(false, |row| {
            row.path = path.to_string();
            row.updated_at = Utc::now();
            true
        }))
    }
}

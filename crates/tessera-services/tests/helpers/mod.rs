//! Shared fixtures for media store integration tests.
//!
//! Every test gets its own temp directory backed `LocalStorage` and fresh
//! in-memory ledger and avatar pointers; no database is required.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tessera_core::models::UploadedFile;
use tessera_db::{AvatarPointers, InMemoryAvatarPointers, InMemoryMediaLedger};
use tessera_services::MediaStore;
use tessera_storage::{LocalStorage, Storage, StorageBackend, StorageError, StorageResult};

pub const BASE_URL: &str = "http://localhost:3000/media";

pub struct TestStore {
    pub store: Arc<MediaStore>,
    pub storage: Arc<FlakyStorage>,
    pub ledger: Arc<InMemoryMediaLedger>,
    pub avatars: Arc<InMemoryAvatarPointers>,
    _temp_dir: TempDir,
}

pub async fn setup_test_store() -> TestStore {
    let avatars = Arc::new(InMemoryAvatarPointers::new());
    let (store, storage, ledger, temp_dir) = setup_store_with_avatars(avatars.clone()).await;

    TestStore {
        store,
        storage,
        ledger,
        avatars,
        _temp_dir: temp_dir,
    }
}

/// Store over temp-dir storage and an in-memory ledger, with the given avatar
/// pointers. The returned `TempDir` must outlive the store.
pub async fn setup_store_with_avatars(
    avatars: Arc<dyn AvatarPointers>,
) -> (
    Arc<MediaStore>,
    Arc<FlakyStorage>,
    Arc<InMemoryMediaLedger>,
    TempDir,
) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let local = LocalStorage::new(temp_dir.path(), BASE_URL.to_string())
        .await
        .expect("Failed to create local storage");
    let storage = Arc::new(FlakyStorage::new(local));
    let ledger = Arc::new(InMemoryMediaLedger::new());

    let store = Arc::new(MediaStore::new(storage.clone(), ledger.clone(), avatars));

    (store, storage, ledger, temp_dir)
}

pub fn jpeg(name: &str) -> UploadedFile {
    UploadedFile::new(name, "image/jpeg", b"\xFF\xD8\xFFjpeg-bytes".to_vec())
}

pub fn png(name: &str) -> UploadedFile {
    UploadedFile::new(name, "image/png", b"\x89PNGpng-bytes".to_vec())
}

/// Local storage with switchable failures.
pub struct FlakyStorage {
    inner: LocalStorage,
    fail_writes: AtomicBool,
    fail_deletes: Mutex<HashSet<String>>,
}

impl FlakyStorage {
    pub fn new(inner: LocalStorage) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_deletes: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, path: &str) {
        self.fail_deletes.lock().unwrap().insert(path.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_writes(false);
        self.fail_deletes.lock().unwrap().clear();
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(format!("injected failure for {}", path)));
        }
        self.inner.put(path, data, content_type).await
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(path).await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.inner.exists(path).await
    }

    async fn delete(&self, path: &str) -> StorageResult<bool> {
        if self.fail_deletes.lock().unwrap().contains(path) {
            return Err(StorageError::DeleteFailed(format!("injected failure for {}", path)));
        }
        self.inner.delete(path).await
    }

    async fn delete_directory(&self, directory: &str) -> StorageResult<bool> {
        self.inner.delete_directory(directory).await
    }

    async fn list_files(&self, directory: &str) -> StorageResult<Vec<String>> {
        self.inner.list_files(directory).await
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        self.inner.copy(from, to).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

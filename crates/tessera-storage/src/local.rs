use crate::keys::{directory_key, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_canonical: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/tessera/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:8080/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_canonical = fs::canonicalize(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        Ok(LocalStorage {
            base_path,
            base_canonical,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects traversal sequences, and keys that resolve (through symlinks)
    /// outside the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&self.base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Convert a filesystem path below the base directory back to a storage key.
    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let segments: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(segments.join("/"))
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn is_dir(path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, path: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
        let file_path = self.key_to_path(path)?;
        let size = data.len();

        self.ensure_parent_dir(&file_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create parent directory for {}: {}",
                file_path.display(),
                e
            ))
        })?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&file_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to write file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to sync file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %file_path.display(),
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let file_path = self.key_to_path(path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&file_path).await.unwrap_or(false) || Self::is_dir(&file_path).await {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let data = fs::read(&file_path).await.map_err(|e| {
            StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        tracing::debug!(
            path = %file_path.display(),
            key = %path,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let file_path = self.key_to_path(path)?;
        Ok(fs::try_exists(&file_path).await.unwrap_or(false))
    }

    async fn delete(&self, path: &str) -> StorageResult<bool> {
        let file_path = self.key_to_path(path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&file_path).await.unwrap_or(false) || Self::is_dir(&file_path).await {
            return Ok(false);
        }

        match fs::remove_file(&file_path).await {
            Ok(()) => {}
            // Lost a race with another deleter; the file is gone either way.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    file_path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %file_path.display(),
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(true)
    }

    async fn delete_directory(&self, directory: &str) -> StorageResult<bool> {
        let key = directory_key(directory)?;
        let dir_path = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        if !Self::is_dir(&dir_path).await {
            return Ok(false);
        }

        match fs::remove_dir_all(&dir_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete directory {}: {}",
                    dir_path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %dir_path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage directory delete successful"
        );

        Ok(true)
    }

    async fn list_files(&self, directory: &str) -> StorageResult<Vec<String>> {
        let key = directory_key(directory)?;
        let root = self.key_to_path(&key)?;

        if !Self::is_dir(&root).await {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| {
                StorageError::BackendError(format!(
                    "Failed to read directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let entry_path = entry.path();
                if file_type.is_dir() {
                    pending.push(entry_path);
                } else if let Some(entry_key) = self.path_to_key(&entry_path) {
                    files.push(entry_key);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        let from_path = self.key_to_path(from)?;
        let to_path = self.key_to_path(to)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to copy {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(
            from_key = %from,
            to_key = %to,
            "Local storage copy successful"
        );

        Ok(to.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        self.generate_url(path)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "http://localhost:8080/media".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_put_get() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let data = b"test data".to_vec();
        let key = storage
            .put("avatars/042/42/avatar.jpg", data.clone(), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(key, "avatars/042/42/avatar.jpg");
        assert_eq!(storage.get(&key).await.unwrap(), data);
        assert_eq!(
            storage.public_url(&key),
            "http://localhost:8080/media/avatars/042/42/avatar.jpg"
        );
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        storage.put("a/b.txt", b"one".to_vec(), "text/plain").await.unwrap();
        storage.put("a/b.txt", b"two".to_vec(), "text/plain").await.unwrap();

        assert_eq!(storage.get("a/b.txt").await.unwrap(), b"two".to_vec());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete_directory("").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage.get("missing/file.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        storage.put("x/y.jpg", b"1".to_vec(), "image/jpeg").await.unwrap();
        assert!(storage.delete("x/y.jpg").await.unwrap());
        assert!(!storage.delete("x/y.jpg").await.unwrap());
        assert!(!storage.exists("x/y.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_directory_is_recursive_and_scoped() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        storage
            .put("providers/007/7/portfolio/a.jpg", b"a".to_vec(), "image/jpeg")
            .await
            .unwrap();
        storage
            .put("providers/007/7/portfolio/b.jpg", b"b".to_vec(), "image/jpeg")
            .await
            .unwrap();
        storage
            .put("providers/007/1007/portfolio/c.jpg", b"c".to_vec(), "image/jpeg")
            .await
            .unwrap();

        assert!(storage.delete_directory("providers/007/7").await.unwrap());
        assert!(!storage.exists("providers/007/7").await.unwrap());
        assert!(storage
            .exists("providers/007/1007/portfolio/c.jpg")
            .await
            .unwrap());

        assert!(!storage.delete_directory("providers/007/7").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_files_recursive_sorted() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        for key in [
            "services/000/5000/main.jpg",
            "services/000/5000/gallery/b.jpg",
            "services/000/5000/gallery/a.jpg",
        ] {
            storage.put(key, b"x".to_vec(), "image/jpeg").await.unwrap();
        }

        let files = storage.list_files("services/000/5000/").await.unwrap();
        assert_eq!(
            files,
            vec![
                "services/000/5000/gallery/a.jpg".to_string(),
                "services/000/5000/gallery/b.jpg".to_string(),
                "services/000/5000/main.jpg".to_string(),
            ]
        );

        assert!(storage.list_files("services/000/6000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_storage_copy() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let data = b"original content".to_vec();
        storage
            .put("avatars/42/avatar.jpg", data.clone(), "image/jpeg")
            .await
            .unwrap();

        let to = storage
            .copy("avatars/42/avatar.jpg", "avatars/042/42/avatar.jpg")
            .await
            .unwrap();

        assert_eq!(to, "avatars/042/42/avatar.jpg");
        assert_eq!(storage.get(&to).await.unwrap(), data);

        let missing = storage.copy("nope.jpg", "dest.jpg").await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }
}

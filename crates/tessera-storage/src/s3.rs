use crate::keys::{directory_key, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};

/// S3 storage implementation
///
/// Directories do not exist in S3; a directory key is treated as a prefix.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO, "https://nyc3.digitaloceanspaces.com" for DigitalOcean Spaces)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the environment; bucket and region are explicit.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    fn location(key: &str) -> StorageResult<Path> {
        validate_key(key)?;
        Ok(Path::from(key.to_string()))
    }

    /// Every object key below `prefix`.
    async fn keys_under(&self, prefix: &Path) -> StorageResult<Vec<String>> {
        let objects: Vec<_> = object_store::ObjectStore::list(&self.store, Some(prefix))
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    "S3 list failed"
                );
                StorageError::BackendError(e.to_string())
            })?;

        let mut keys: Vec<String> = objects
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Build the public URL of an object.
///
/// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
/// For S3-compatible providers, uses path style below the endpoint: {endpoint}/{bucket}/{key}
pub(crate) fn object_url(
    bucket: &str,
    region: &str,
    endpoint_url: Option<&str>,
    key: &str,
) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(&self, path: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
        let location = Self::location(path)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %path,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 write failed"
            );
            StorageError::WriteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 write successful"
        );

        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let location = Self::location(path)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 read failed"
                );
                StorageError::ReadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 read successful"
        );

        Ok(bytes.to_vec())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = Self::location(path)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn delete(&self, path: &str) -> StorageResult<bool> {
        if !self.exists(path).await? {
            return Ok(false);
        }

        let location = Self::location(path)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) => {}
            Err(ObjectStoreError::NotFound { .. }) => return Ok(false),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(true)
    }

    async fn delete_directory(&self, directory: &str) -> StorageResult<bool> {
        let prefix = Self::location(&directory_key(directory)?)?;
        let start = std::time::Instant::now();
        let keys = self.keys_under(&prefix).await?;

        if keys.is_empty() {
            return Ok(false);
        }

        for key in &keys {
            let result: ObjectResult<_> = self.store.delete(&Path::from(key.clone())).await;
            match result {
                Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        "S3 delete failed during directory delete"
                    );
                    return Err(StorageError::DeleteFailed(e.to_string()));
                }
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            prefix = %prefix,
            object_count = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 directory delete successful"
        );

        Ok(true)
    }

    async fn list_files(&self, directory: &str) -> StorageResult<Vec<String>> {
        let prefix = Self::location(&directory_key(directory)?)?;
        self.keys_under(&prefix).await
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<String> {
        let from_location = Self::location(from)?;
        let to_location = Self::location(to)?;
        let start = std::time::Instant::now();

        let copy_result: ObjectResult<_> = self.store.copy(&from_location, &to_location).await;

        copy_result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(from.to_string()),
            other => StorageError::BackendError(other.to_string()),
        })?;

        tracing::info!(
            from_key = %from,
            to_key = %to,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(to.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        object_url(&self.bucket, &self.region, self.endpoint_url.as_deref(), path)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

//! Configuration module
//!
//! Storage backend selection, ledger database settings and retention
//! settings, read from the environment (with `.env` support).

use std::env;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MEDIA_RETENTION_DAYS: i64 = 30;
/// Upper bound on the grace period (100 years).
pub const MAX_MEDIA_RETENTION_DAYS: i64 = 36_500;
const MEDIA_SWEEP_BATCH_SIZE: usize = 100;
const MEDIA_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;
const TEMP_UPLOAD_DIRECTORY: &str = "temp";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    // Ledger database
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, ...)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Retention
    pub media_retention_days: i64,
    pub media_sweep_batch_size: usize,
    pub media_sweep_interval_secs: u64,
    pub temp_upload_directory: String,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(s) => s.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let config = Config {
            environment,
            database_url: var("DATABASE_URL").filter(|s| !s.is_empty()),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: var("S3_BUCKET").filter(|s| !s.is_empty()),
            s3_region: var("S3_REGION").filter(|s| !s.is_empty()),
            s3_endpoint: var("S3_ENDPOINT").filter(|s| !s.is_empty()),
            aws_region: var("AWS_REGION").filter(|s| !s.is_empty()),
            local_storage_path: var("LOCAL_STORAGE_PATH").filter(|s| !s.is_empty()),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL").filter(|s| !s.is_empty()),
            media_retention_days: var("MEDIA_RETENTION_DAYS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MEDIA_RETENTION_DAYS),
            media_sweep_batch_size: var("MEDIA_SWEEP_BATCH_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MEDIA_SWEEP_BATCH_SIZE),
            media_sweep_interval_secs: var("MEDIA_SWEEP_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MEDIA_SWEEP_INTERVAL_SECS),
            temp_upload_directory: var("TEMP_UPLOAD_DIRECTORY")
                .map(|s| s.trim_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| TEMP_UPLOAD_DIRECTORY.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if !(0..=MAX_MEDIA_RETENTION_DAYS).contains(&self.media_retention_days) {
            return Err(anyhow::anyhow!(
                "MEDIA_RETENTION_DAYS must be between 0 and {}",
                MAX_MEDIA_RETENTION_DAYS
            ));
        }

        if self.media_sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!("MEDIA_SWEEP_INTERVAL_SECS must be at least 1"));
        }

        if self.media_sweep_batch_size == 0 {
            return Err(anyhow::anyhow!("MEDIA_SWEEP_BATCH_SIZE must be at least 1"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn database_url(&self) -> Result<&str, anyhow::Error> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }
}

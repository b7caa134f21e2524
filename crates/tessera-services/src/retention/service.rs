use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{AppError, Config};
use tokio::time::interval;

use crate::media::MediaStore;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Retention settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Grace period before a soft-deleted record is purged.
    pub retention_days: i64,
    /// Trashed records fetched per batch.
    pub batch_size: usize,
    /// Time between sweeps when running in the background.
    pub interval: Duration,
    /// Directory wiped on every sweep.
    pub temp_directory: String,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            batch_size: 100,
            interval: Duration::from_secs(24 * 60 * 60),
            temp_directory: "temp".to_string(),
        }
    }
}

impl RetentionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retention_days: config.media_retention_days,
            batch_size: config.media_sweep_batch_size,
            interval: Duration::from_secs(config.media_sweep_interval_secs),
            temp_directory: config.temp_upload_directory.clone(),
        }
    }
}

/// Counters for one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Trashed records past the grace period that were examined.
    pub scanned: usize,
    /// Records whose file and row were removed.
    pub purged: usize,
    /// Records skipped because their file could not be deleted.
    pub file_errors: usize,
    /// Records skipped because of a ledger failure.
    pub row_errors: usize,
    /// Whether the temp upload directory existed and was wiped.
    pub temp_cleared: bool,
}

/// Retention sweeper
///
/// Permanently deletes soft-deleted media once the grace period has elapsed
/// and wipes the temp upload directory. Failures are isolated per record: a
/// record that cannot be purged is logged, counted and retried on the next
/// sweep.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<MediaStore>,
    config: RetentionConfig,
}

impl RetentionSweeper {
    pub fn new(store: Arc<MediaStore>, config: RetentionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Start the background sweep task.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            // tokio rejects a zero period.
            let mut sweep_interval = interval(self.config.interval.max(MIN_SWEEP_INTERVAL));

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled media retention sweep");

                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Retention sweep failed");
                }
            }
        })
    }

    /// Run one sweep against the current time.
    pub async fn run_once(&self) -> Result<SweepReport, AppError> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep as if the current time were `now`.
    ///
    /// Only listing failures abort the scan; everything else is per record.
    /// The temp upload directory is wiped even when the scan fails.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "media_retention"))]
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let mut report = SweepReport::default();

        let scan = self.purge_expired(now, &mut report).await;

        report.temp_cleared = self.clear_temp_directory().await;

        let cutoff = scan?;

        tracing::info!(
            scanned = report.scanned,
            purged = report.purged,
            file_errors = report.file_errors,
            row_errors = report.row_errors,
            temp_cleared = report.temp_cleared,
            cutoff = %cutoff,
            "Media retention sweep completed"
        );

        Ok(report)
    }

    /// Purge every trashed record deleted before the grace period ended.
    /// Returns the cutoff used.
    async fn purge_expired(
        &self,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<DateTime<Utc>, AppError> {
        let cutoff = ChronoDuration::try_days(self.config.retention_days)
            .and_then(|grace| now.checked_sub_signed(grace))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Retention period of {} days is out of range",
                    self.config.retention_days
                ))
            })?;
        let batch_size = self.config.batch_size.max(1);
        let mut after_id = 0;

        loop {
            let batch = self
                .store
                .ledger()
                .list_trashed_before(cutoff, after_id, batch_size)
                .await?;

            let Some(last) = batch.last() else {
                break;
            };
            after_id = last.id;
            let full_batch = batch.len() == batch_size;

            for record in &batch {
                report.scanned += 1;

                match self.store.purge_trashed(record).await {
                    Ok(true) => {
                        report.purged += 1;
                        tracing::debug!(
                            media_id = record.id,
                            path = %record.path,
                            deleted_at = ?record.deleted_at,
                            "Purged expired media"
                        );
                    }
                    Ok(false) => {
                        tracing::debug!(media_id = record.id, "Media no longer trashed, skipping");
                    }
                    Err(AppError::StorageDelete(msg)) => {
                        report.file_errors += 1;
                        tracing::error!(
                            error = %msg,
                            media_id = record.id,
                            path = %record.path,
                            "Failed to delete expired media file, keeping record for the next sweep"
                        );
                    }
                    Err(e) => {
                        report.row_errors += 1;
                        tracing::error!(
                            error = %e,
                            media_id = record.id,
                            "Failed to purge expired media record"
                        );
                    }
                }
            }

            if !full_batch {
                break;
            }
        }

        Ok(cutoff)
    }

    /// Wipe the temp upload directory, regardless of the age of its files.
    async fn clear_temp_directory(&self) -> bool {
        let directory = &self.config.temp_directory;
        match self.store.storage().delete_directory(directory).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    directory = %directory,
                    "Failed to clear temp upload directory"
                );
                false
            }
        }
    }
}

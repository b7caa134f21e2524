//! Legacy avatar path migration.
//!
//! Avatars stored before sharding live at arbitrary paths such as
//! `avatars/42/photo.jpg`. The migrator moves each one to
//! `avatars/{shard}/{id}/{file name}`, repoints the user and the ledger, and
//! removes the legacy file and its directory once empty.

use serde::Serialize;
use std::sync::Arc;
use tessera_core::models::OwnerRef;
use tessera_core::{build_path, AppError};

use crate::media::MediaStore;

/// One avatar move, planned or performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub user_id: u64,
    pub from: String,
    pub to: String,
}

/// Operator-facing summary of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub migrated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub planned: Vec<PlannedMove>,
}

pub struct LegacyPathMigrator {
    store: Arc<MediaStore>,
}

impl LegacyPathMigrator {
    pub fn new(store: Arc<MediaStore>) -> Self {
        Self { store }
    }

    /// Migrate every legacy avatar. With `dry_run` nothing is mutated and the
    /// report only lists the planned moves.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, dry_run: bool) -> Result<MigrationReport, AppError> {
        let mut report = MigrationReport {
            dry_run,
            ..MigrationReport::default()
        };

        for (user_id, from) in self.store.avatars().all_avatars().await? {
            let Some(to) = sharded_target(user_id, &from) else {
                report.skipped += 1;
                continue;
            };

            match self.store.storage().exists(&from).await {
                Ok(true) => {}
                Ok(false) => {
                    report.errors += 1;
                    tracing::warn!(user_id, from = %from, "Legacy avatar file is missing");
                    continue;
                }
                Err(e) => {
                    report.errors += 1;
                    tracing::error!(error = %e, user_id, from = %from, "Failed to check legacy avatar");
                    continue;
                }
            }

            let planned = PlannedMove {
                user_id,
                from: from.clone(),
                to: to.clone(),
            };

            if dry_run {
                tracing::info!(user_id, from = %from, to = %to, "Would migrate avatar");
                report.planned.push(planned);
                continue;
            }

            match self.migrate_one(user_id, &from, &to).await {
                Ok(()) => {
                    report.migrated += 1;
                    report.planned.push(planned);
                }
                Err(e) => {
                    report.errors += 1;
                    tracing::error!(error = %e, user_id, from = %from, to = %to, "Avatar migration failed");
                }
            }
        }

        tracing::info!(
            dry_run,
            migrated = report.migrated,
            skipped = report.skipped,
            errors = report.errors,
            planned = report.planned.len(),
            "Legacy avatar migration finished"
        );

        Ok(report)
    }

    async fn migrate_one(&self, user_id: u64, from: &str, to: &str) -> Result<(), AppError> {
        let storage = self.store.storage();
        let _guard = self.store.locks().lock(OwnerRef::user(user_id)).await;

        storage
            .copy(from, to)
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))?;

        self.store.avatars().set_avatar(user_id, Some(to)).await?;

        if let Some(record) = self.store.ledger().find_live_by_path(from).await? {
            self.store.ledger().update_path(record.id, to).await?;
        }

        if let Err(e) = storage.delete(from).await {
            tracing::warn!(error = %e, from = %from, "Failed to delete legacy avatar, continuing");
            return Ok(());
        }

        if let Some((legacy_dir, _)) = from.rsplit_once('/') {
            self.store.remove_directory_if_empty(legacy_dir).await;
        }

        tracing::info!(user_id, from = %from, to = %to, "Avatar migrated");
        Ok(())
    }
}

/// Sharded destination of a legacy avatar path, or None if it is already sharded
/// or has no usable file name.
pub fn sharded_target(user_id: u64, legacy_path: &str) -> Option<String> {
    let directory = build_path("avatars", user_id, None);
    if legacy_path.starts_with(&format!("{}/", directory)) {
        return None;
    }

    let file_name = legacy_path.rsplit('/').next().filter(|n| !n.is_empty())?;
    Some(format!("{}/{}", directory, file_name))
}

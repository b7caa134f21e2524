//! Tessera CLI: operator commands for the sharded media store.
//!
//! Reads the same environment as the services (DATABASE_URL, STORAGE_BACKEND,
//! LOCAL_STORAGE_PATH, S3_BUCKET, ...), from `.env` when present.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tessera_cli::{connect_store, init_tracing, owner_layout, print_json};
use tessera_core::models::{OwnerRef, OwnerType, SizeVariant};
use tessera_core::Config;
use tessera_db::{run_migrations, setup_database};
use tessera_services::{LegacyPathMigrator, RetentionConfig, RetentionSweeper};

#[derive(Parser)]
#[command(name = "tessera", about = "Tessera media storage operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the shard and directories of an owner
    Layout {
        /// Owner type: user, provider, service, review
        owner_type: OwnerType,
        /// Owner id
        owner_id: u64,
    },
    /// Print the public URL of a stored path
    Url {
        /// Storage path, e.g. avatars/042/42/avatar.jpg
        path: String,
        /// Size variant: original, large, medium, thumb
        #[arg(long, default_value = "original")]
        size: SizeVariant,
    },
    /// Apply pending ledger migrations
    MigrateDb,
    /// Run one retention sweep and print the report
    Sweep,
    /// Run the retention sweeper until interrupted
    Sweeper,
    /// Move legacy avatars into their sharded directories
    MigratePaths {
        /// Only report what would be moved
        #[arg(long)]
        dry_run: bool,
    },
    /// Permanently delete every file and record of an owner
    PurgeOwner {
        /// Owner type: user, provider, service, review
        owner_type: OwnerType,
        /// Owner id
        owner_id: u64,
    },
    /// Restore a soft-deleted media record
    Restore {
        /// Ledger id of the record
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if let Commands::Layout {
        owner_type,
        owner_id,
    } = cli.command
    {
        return print_json(&owner_layout(OwnerRef::new(owner_type, owner_id)));
    }

    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Layout { .. } => {}
        Commands::Url { path, size } => {
            let store = connect_store(&config).await?;
            print_json(&serde_json::json!({ "url": store.get_url(&path, size) }))?;
        }
        Commands::MigrateDb => {
            let pool = setup_database(&config).await?;
            run_migrations(&pool).await?;
            print_json(&serde_json::json!({ "success": true }))?;
        }
        Commands::Sweep => {
            let store = connect_store(&config).await?;
            let sweeper = RetentionSweeper::new(store, RetentionConfig::from_config(&config));
            let report = sweeper.run_once().await?;
            print_json(&report)?;
        }
        Commands::Sweeper => {
            let store = connect_store(&config).await?;
            let sweeper = Arc::new(RetentionSweeper::new(
                store,
                RetentionConfig::from_config(&config),
            ));
            tracing::info!(
                interval_secs = sweeper.config().interval.as_secs(),
                retention_days = sweeper.config().retention_days,
                "Retention sweeper started"
            );
            let handle = sweeper.start();

            shutdown_signal().await?;
            handle.abort();
            tracing::info!("Retention sweeper stopped");
        }
        Commands::MigratePaths { dry_run } => {
            let store = connect_store(&config).await?;
            let report = LegacyPathMigrator::new(store).run(dry_run).await?;
            print_json(&report)?;
        }
        Commands::PurgeOwner {
            owner_type,
            owner_id,
        } => {
            let store = connect_store(&config).await?;
            let purge = store
                .force_delete_owner(OwnerRef::new(owner_type, owner_id))
                .await?;
            print_json(&purge)?;
        }
        Commands::Restore { id } => {
            let store = connect_store(&config).await?;
            let record = store.restore_media(id).await?;
            print_json(&record)?;
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                tracing::info!("Received Ctrl+C signal");
            }
            _ = terminate.recv() => {
                tracing::info!("Received terminate signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        tracing::info!("Received Ctrl+C signal");
    }

    Ok(())
}

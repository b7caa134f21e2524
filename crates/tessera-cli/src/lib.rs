use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tessera_core::models::{MediaCollection, OwnerRef, OwnerType};
use tessera_core::{build_path, shard, Config};
use tessera_db::{setup_database, PgAvatarPointers, PgMediaLedger};
use tessera_services::{create_storage, MediaStore};

/// Initialize tracing for the CLI.
///
/// `LOG_FORMAT=json` switches to JSON lines for log shippers.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Where an owner's media lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerLayout {
    pub owner_type: OwnerType,
    pub owner_id: u64,
    pub shard: String,
    pub directory: String,
    pub collections: Vec<CollectionLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionLayout {
    pub collection: MediaCollection,
    pub directory: String,
}

pub fn owner_layout(owner: OwnerRef) -> OwnerLayout {
    let collections = owner
        .owner_type
        .collections()
        .iter()
        .map(|c| CollectionLayout {
            collection: *c,
            directory: build_path(c.path_kind(), owner.owner_id, c.subpath()),
        })
        .collect();

    OwnerLayout {
        owner_type: owner.owner_type,
        owner_id: owner.owner_id,
        shard: shard(owner.owner_id),
        directory: owner.directory(),
        collections,
    }
}

/// Wire the media store against the configured storage backend and the
/// Postgres ledger.
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<MediaStore>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;
    let pool = setup_database(config).await?;

    Ok(Arc::new(MediaStore::new(
        storage,
        Arc::new(PgMediaLedger::new(pool.clone())),
        Arc::new(PgAvatarPointers::new(pool)),
    )))
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_layout_includes_portfolio_subdirectory() {
        let layout = owner_layout(OwnerRef::provider(123456));

        assert_eq!(layout.shard, "456");
        assert_eq!(layout.directory, "providers/456/123456");
        assert_eq!(
            layout.collections,
            vec![CollectionLayout {
                collection: MediaCollection::Portfolio,
                directory: "providers/456/123456/portfolio".to_string(),
            }]
        );
    }

    #[test]
    fn service_layout_lists_both_collections() {
        let layout = owner_layout(OwnerRef::service(5));
        let dirs: Vec<&str> = layout
            .collections
            .iter()
            .map(|c| c.directory.as_str())
            .collect();

        assert_eq!(dirs, vec!["services/005/5", "services/005/5/gallery"]);
    }

    #[test]
    fn layout_serializes_lowercase_names() {
        let json = serde_json::to_value(owner_layout(OwnerRef::user(42))).unwrap();

        assert_eq!(json["owner_type"], "user");
        assert_eq!(json["directory"], "avatars/042/42");
        assert_eq!(json["collections"][0]["collection"], "avatar");
    }
}

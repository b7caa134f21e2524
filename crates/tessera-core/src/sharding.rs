//! Shard calculation and sharded path layout.
//!
//! Every owner's media lives under `{type}/{shard}/{id}`, where `shard` is
//! `id mod 1000` rendered as three zero-padded digits. The fixed bucket count
//! bounds the number of entries any single directory can accumulate on a
//! filesystem-backed store.

/// Number of shard buckets (`000` through `999`).
pub const SHARD_COUNT: u64 = 1000;

/// Map an entity id to its three-digit shard bucket.
///
/// `shard(1) == "001"`, `shard(123456) == "456"`, `shard(2000) == "000"`.
pub fn shard(id: u64) -> String {
    format!("{:03}", id % SHARD_COUNT)
}

/// Compose `{kind}/{shard}/{id}` with an optional trailing subpath.
///
/// `kind` is an opaque path segment (`avatars`, `providers`, ...); no
/// validation happens here. Leading and trailing slashes on `subpath` are
/// ignored and an empty subpath is treated as absent.
pub fn build_path(kind: &str, id: u64, subpath: Option<&str>) -> String {
    let base = format!("{}/{}/{}", kind, shard(id), id);
    match subpath.map(|s| s.trim_matches('/')) {
        Some(sub) if !sub.is_empty() => format!("{}/{}", base, sub),
        _ => base,
    }
}

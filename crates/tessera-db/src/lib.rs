//! Tessera database layer
//!
//! The media record ledger and the denormalized owner pointers, each behind a
//! trait with a PostgreSQL implementation and an in-memory one.

pub mod db;
pub mod setup;

pub use db::media::{InMemoryMediaLedger, MediaLedger, PgMediaLedger};
pub use db::owner::{AvatarPointers, InMemoryAvatarPointers, PgAvatarPointers};
pub use setup::{run_migrations, setup_database};

pub mod ledger;
pub mod memory;
pub mod postgres;

pub use ledger::{MediaLedger, SlotReplacement};
pub use memory::InMemoryMediaLedger;
pub use postgres::{MediaRow, PgMediaLedger};

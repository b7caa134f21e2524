pub mod service;

pub use service::{RetentionConfig, RetentionSweeper, SweepReport};

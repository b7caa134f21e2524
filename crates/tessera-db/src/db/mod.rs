//! Database repositories for data access layer
//!
//! Repositories are organized into media/ (the media record ledger) and owner/
//! (denormalized pointers stored on the owning entities).

pub mod media;
pub mod owner;

use tessera_core::AppError;

/// Convert a domain id to a BIGINT column value.
pub(crate) fn to_db_id(id: u64) -> Result<i64, AppError> {
    i64::try_from(id).map_err(|_| AppError::Validation(format!("Id {} is out of range", id)))
}

/// Convert a BIGINT column value back to a domain id.
pub(crate) fn from_db_id(id: i64) -> Result<u64, AppError> {
    u64::try_from(id).map_err(|_| AppError::Internal(format!("Negative id {} in database", id)))
}

/// Map unique violations to `Conflict`, everything else to `Database`.
pub(crate) fn map_write_error(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("{} already exists", what));
        }
    }
    AppError::Database(err)
}

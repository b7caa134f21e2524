//! Media store: uploads, URL resolution and deletion.

mod accessors;
mod lifecycle;
mod store;

pub use lifecycle::OwnerPurge;
pub use store::MediaStore;

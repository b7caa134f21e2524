//! Data models for media storage
//!
//! Ledger records, owner references, the closed collection enumeration and
//! the uploaded-file input type.

mod media;
mod upload;

pub use media::{
    MediaCollection, MediaMetadata, MediaRecord, NewMediaRecord, OwnerRef, OwnerType,
    SizeVariant,
};
pub use upload::UploadedFile;

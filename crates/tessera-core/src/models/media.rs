use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;
use crate::sharding::build_path;
use crate::storage_types::StorageBackend;

/// Open key/value metadata attached to a media record (width, height, ...).
pub type MediaMetadata = serde_json::Map<String, JsonValue>;

/// Kind of entity that owns media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_owner_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    User,
    Provider,
    Service,
    Review,
}

impl OwnerType {
    pub const ALL: [OwnerType; 4] = [
        OwnerType::User,
        OwnerType::Provider,
        OwnerType::Service,
        OwnerType::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::User => "user",
            OwnerType::Provider => "provider",
            OwnerType::Service => "service",
            OwnerType::Review => "review",
        }
    }

    /// Top-level storage directory for this owner type.
    pub fn path_kind(&self) -> &'static str {
        match self {
            OwnerType::User => "avatars",
            OwnerType::Provider => "providers",
            OwnerType::Service => "services",
            OwnerType::Review => "reviews",
        }
    }

    /// Collections an owner of this type may hold.
    pub fn collections(&self) -> &'static [MediaCollection] {
        match self {
            OwnerType::User => &[MediaCollection::Avatar],
            OwnerType::Provider => &[MediaCollection::Portfolio],
            OwnerType::Service => &[MediaCollection::ServiceMain, MediaCollection::ServiceGallery],
            OwnerType::Review => &[MediaCollection::Review],
        }
    }
}

impl Display for OwnerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(OwnerType::User),
            "provider" => Ok(OwnerType::Provider),
            "service" => Ok(OwnerType::Service),
            "review" => Ok(OwnerType::Review),
            other => Err(AppError::Validation(format!("Unknown owner type: {}", other))),
        }
    }
}

/// Explicit reference to the entity owning a media record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub owner_type: OwnerType,
    pub owner_id: u64,
}

impl OwnerRef {
    pub fn new(owner_type: OwnerType, owner_id: u64) -> Self {
        Self {
            owner_type,
            owner_id,
        }
    }

    pub fn user(id: u64) -> Self {
        Self::new(OwnerType::User, id)
    }

    pub fn provider(id: u64) -> Self {
        Self::new(OwnerType::Provider, id)
    }

    pub fn service(id: u64) -> Self {
        Self::new(OwnerType::Service, id)
    }

    pub fn review(id: u64) -> Self {
        Self::new(OwnerType::Review, id)
    }

    /// `{type}/{shard}/{id}` directory holding every file of this owner.
    pub fn directory(&self) -> String {
        build_path(self.owner_type.path_kind(), self.owner_id, None)
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.owner_type, self.owner_id)
    }
}

/// Closed set of media collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_collection", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MediaCollection {
    Avatar,
    Portfolio,
    ServiceMain,
    ServiceGallery,
    Review,
}

impl MediaCollection {
    pub const ALL: [MediaCollection; 5] = [
        MediaCollection::Avatar,
        MediaCollection::Portfolio,
        MediaCollection::ServiceMain,
        MediaCollection::ServiceGallery,
        MediaCollection::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCollection::Avatar => "avatar",
            MediaCollection::Portfolio => "portfolio",
            MediaCollection::ServiceMain => "service_main",
            MediaCollection::ServiceGallery => "service_gallery",
            MediaCollection::Review => "review",
        }
    }

    /// Owner type every record of this collection belongs to.
    pub fn owner_type(&self) -> OwnerType {
        match self {
            MediaCollection::Avatar => OwnerType::User,
            MediaCollection::Portfolio => OwnerType::Provider,
            MediaCollection::ServiceMain | MediaCollection::ServiceGallery => OwnerType::Service,
            MediaCollection::Review => OwnerType::Review,
        }
    }

    /// Top-level storage directory, derived from the owner type.
    pub fn path_kind(&self) -> &'static str {
        self.owner_type().path_kind()
    }

    /// Subdirectory below the owner directory, if any.
    pub fn subpath(&self) -> Option<&'static str> {
        match self {
            MediaCollection::Portfolio => Some("portfolio"),
            MediaCollection::ServiceGallery => Some("gallery"),
            MediaCollection::Avatar | MediaCollection::ServiceMain | MediaCollection::Review => {
                None
            }
        }
    }

    /// Single-slot collections hold at most one live record per owner.
    pub fn is_single_slot(&self) -> bool {
        matches!(self, MediaCollection::Avatar | MediaCollection::ServiceMain)
    }
}

impl Display for MediaCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaCollection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaCollection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown media collection: {}", s)))
    }
}

/// Named URL variants. Only `Original` maps to a stored file today; the
/// others are resolved through URL templating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeVariant {
    #[default]
    Original,
    Large,
    Medium,
    Thumb,
}

impl SizeVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeVariant::Original => "original",
            SizeVariant::Large => "large",
            SizeVariant::Medium => "medium",
            SizeVariant::Thumb => "thumb",
        }
    }
}

impl FromStr for SizeVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(SizeVariant::Original),
            "large" => Ok(SizeVariant::Large),
            "medium" => Ok(SizeVariant::Medium),
            "thumb" => Ok(SizeVariant::Thumb),
            other => Err(AppError::Validation(format!("Unknown size variant: {}", other))),
        }
    }
}

/// Ledger entry for one stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    /// Stable identifier for external references.
    pub uuid: Uuid,
    pub owner_type: OwnerType,
    pub owner_id: u64,
    pub collection: MediaCollection,
    pub storage_backend: StorageBackend,
    pub path: String,
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub order: i32,
    pub metadata: MediaMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MediaRecord {
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type, self.owner_id)
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Values for a ledger insert; id, uuid and timestamps are assigned by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMediaRecord {
    pub owner: OwnerRef,
    pub collection: MediaCollection,
    pub storage_backend: StorageBackend,
    pub path: String,
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub order: i32,
    pub metadata: MediaMetadata,
}

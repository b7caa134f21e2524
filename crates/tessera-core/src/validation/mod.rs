//! Upload validation.
//!
//! Size ceilings and accepted MIME types are a static table keyed by
//! collection. Anything without its own row uses `DEFAULT_RULES`.

use crate::error::AppError;
use crate::models::{MediaCollection, UploadedFile};

const MB: usize = 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];
const IMAGE_TYPES_WITH_GIF: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Limits applied to one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRules {
    pub max_size_bytes: usize,
    pub allowed_content_types: &'static [&'static str],
}

/// Fallback for collections without a dedicated row.
pub const DEFAULT_RULES: UploadRules = UploadRules {
    max_size_bytes: 10 * MB,
    allowed_content_types: IMAGE_TYPES_WITH_GIF,
};

const RULES: &[(MediaCollection, UploadRules)] = &[
    (
        MediaCollection::Avatar,
        UploadRules {
            max_size_bytes: 2 * MB,
            allowed_content_types: IMAGE_TYPES,
        },
    ),
    (
        MediaCollection::Portfolio,
        UploadRules {
            max_size_bytes: 5 * MB,
            allowed_content_types: IMAGE_TYPES,
        },
    ),
    (
        MediaCollection::ServiceMain,
        UploadRules {
            max_size_bytes: 5 * MB,
            allowed_content_types: IMAGE_TYPES,
        },
    ),
    (
        MediaCollection::ServiceGallery,
        UploadRules {
            max_size_bytes: 5 * MB,
            allowed_content_types: IMAGE_TYPES,
        },
    ),
];

/// Look up the rules for a collection, falling back to `DEFAULT_RULES`.
pub fn rules_for(collection: MediaCollection) -> UploadRules {
    RULES
        .iter()
        .find(|(c, _)| *c == collection)
        .map(|(_, rules)| *rules)
        .unwrap_or(DEFAULT_RULES)
}

/// Validate an upload against its collection's rules.
///
/// Runs before any storage mutation so a rejected file leaves nothing behind.
pub fn validate_upload(collection: MediaCollection, file: &UploadedFile) -> Result<(), AppError> {
    let rules = rules_for(collection);

    if file.data.is_empty() {
        return Err(AppError::Validation("Empty file".to_string()));
    }

    if file.size() > rules.max_size_bytes {
        return Err(AppError::PayloadTooLarge {
            size: file.size(),
            max: rules.max_size_bytes,
        });
    }

    let essence = file
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if !rules.allowed_content_types.iter().any(|ct| *ct == essence) {
        return Err(AppError::UnsupportedMediaType(format!(
            "{} is not accepted for {} (allowed: {})",
            file.content_type,
            collection,
            rules.allowed_content_types.join(", ")
        )));
    }

    Ok(())
}

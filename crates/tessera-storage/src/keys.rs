//! Shared key checks for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the storage root or address it directly.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }

    if key.starts_with('/') || key.contains('\\') || key.split('/').any(|seg| seg == "..") {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Normalise a directory key: no leading or trailing slashes.
pub fn directory_key(directory: &str) -> StorageResult<String> {
    let trimmed = directory.trim_end_matches('/');
    validate_key(trimmed)?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_sharded_keys() {
        assert!(validate_key("avatars/042/42/avatar.jpg").is_ok());
        assert!(validate_key("temp").is_ok());
    }

    #[test]
    fn rejects_traversal_and_absolute_keys() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("avatars/../../etc").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn directory_key_strips_trailing_slash() {
        assert_eq!(directory_key("avatars/042/42/").unwrap(), "avatars/042/42");
        assert!(directory_key("/").is_err());
    }
}

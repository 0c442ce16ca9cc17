//! Shared key generation for storage backends.
//!
//! Key format: `{purpose_prefix}/{owner_id}/{uuid}.{ext}`, e.g.
//! `logos/6f1c.../0b3e....png`. The uploader's filename never appears in a key.

use crate::traits::{StorageError, StorageResult};
use brandmark_core::models::AssetPurpose;
use uuid::Uuid;

/// Generate a fresh, collision-free key for an owner's asset.
pub fn generate_object_key(owner_id: Uuid, purpose: AssetPurpose, extension: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        purpose.key_prefix(),
        owner_id,
        Uuid::new_v4(),
        extension
    )
}

/// Owner and purpose a key was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedKey {
    pub owner_id: Uuid,
    pub purpose: AssetPurpose,
    pub object_id: Uuid,
}

/// Parse a key produced by [`generate_object_key`].
pub fn parse_object_key(key: &str) -> StorageResult<ParsedKey> {
    validate_key(key)?;

    let mut parts = key.split('/');
    let (Some(prefix), Some(owner), Some(file), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(StorageError::InvalidKey(format!(
            "Unexpected key layout: {}",
            key
        )));
    };

    let purpose = AssetPurpose::from_key_prefix(prefix)
        .ok_or_else(|| StorageError::InvalidKey(format!("Unknown key prefix: {}", prefix)))?;
    let owner_id = Uuid::parse_str(owner)
        .map_err(|_| StorageError::InvalidKey(format!("Invalid owner segment: {}", owner)))?;
    let stem = file.split_once('.').map(|(stem, _)| stem).unwrap_or(file);
    let object_id = Uuid::parse_str(stem)
        .map_err(|_| StorageError::InvalidKey(format!("Invalid object segment: {}", file)))?;

    Ok(ParsedKey {
        owner_id,
        purpose,
        object_id,
    })
}

/// Reject keys that could escape the bucket or the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.contains("..")
        || key.starts_with('/')
        || key.contains('\\')
        || key.chars().any(char::is_control)
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique_and_parse_back() {
        let owner = Uuid::new_v4();
        let a = generate_object_key(owner, AssetPurpose::Logo, "png");
        let b = generate_object_key(owner, AssetPurpose::Logo, "png");
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("logos/{}/", owner)));
        assert!(a.ends_with(".png"));

        let parsed = parse_object_key(&a).unwrap();
        assert_eq!(parsed.owner_id, owner);
        assert_eq!(parsed.purpose, AssetPurpose::Logo);
    }

    #[test]
    fn rejects_foreign_layouts() {
        let owner = Uuid::new_v4();
        assert!(parse_object_key(&format!("media/{}/{}.png", owner, Uuid::new_v4())).is_err());
        assert!(parse_object_key(&format!("logos/{}/logo.png", owner)).is_err());
        assert!(parse_object_key(&format!("logos/{}/x/{}.png", owner, Uuid::new_v4())).is_err());
        assert!(parse_object_key("logos/not-a-uuid/a.png").is_err());
    }

    #[test]
    fn rejects_traversal() {
        assert!(matches!(
            validate_key("../../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }
}

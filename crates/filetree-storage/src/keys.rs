//! Storage path layout.

use std::path::Path;

use filetree_core::AppError;
use filetree_core::result::AppResult;
use filetree_core::types::id::OwnerId;

/// Longest file extension carried over into a storage path.
const MAX_EXTENSION_LEN: usize = 16;

/// Build a fresh storage path `{namespace}/{owner}/{uuid}[.{ext}]`.
///
/// The extension of `original_name` is kept (lowercased) when it is plain
/// ASCII alphanumerics, which keeps stored blobs recognizable on disk.
pub fn blob_key(namespace: &str, owner_id: OwnerId, original_name: &str) -> String {
    let id = uuid::Uuid::new_v4();
    let namespace = namespace.trim_matches('/');
    match extension(original_name) {
        Some(ext) => format!("{namespace}/{owner_id}/{id}.{ext}"),
        None => format!("{namespace}/{owner_id}/{id}"),
    }
}

fn extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Reject storage paths that could escape the store's root.
pub fn validate_key(storage_path: &str) -> AppResult<()> {
    let escapes = storage_path.is_empty()
        || storage_path.starts_with('/')
        || storage_path.contains('\\')
        || storage_path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if escapes {
        return Err(AppError::invalid_input(format!(
            "Invalid storage path: '{storage_path}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key_layout() {
        let owner = OwnerId::new();
        let key = blob_key("files", owner, "Report.PDF");
        let prefix = format!("files/{owner}/");
        assert!(key.starts_with(&prefix));
        assert!(key.ends_with(".pdf"));
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn test_blob_key_drops_odd_extensions() {
        let owner = OwnerId::new();
        assert!(!blob_key("files", owner, "README").contains('.'));
        assert!(!blob_key("files", owner, "x.tar gz").ends_with("gz"));
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("files//x").is_err());
        assert!(validate_key("").is_err());
    }
}

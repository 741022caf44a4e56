//! Blob store contract shared by every persistence backend.

use super::{RepositoryError, Result};

/// Durable key → bytes storage.
///
/// Implementations must be safe to call concurrently for different keys.
/// Same-key writes race with last-writer-wins semantics.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Load the bytes stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Check whether `key` is present.
    fn exists(&self, key: &str) -> bool;

    /// Delete `key`. Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// List all stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>> {
        Ok(vec![])
    }

    /// Delete every key accepted by `filter`, returning how many were removed.
    fn delete_where(&self, filter: &dyn Fn(&str) -> bool) -> Result<usize> {
        let mut deleted = 0;
        for key in self.keys()? {
            if filter(&key) {
                self.delete(&key)?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Reject keys that cannot be mapped safely onto a single file name.
pub fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key.contains(['/', '\\']) {
        Some("key contains a path separator")
    } else if key.contains("..") {
        Some("key contains '..'")
    } else if key.chars().any(char::is_control) {
        Some("key contains control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RepositoryError::InvalidKey {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

//! In-memory BlobStore implementation for tests and ephemeral sessions.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::repository::{BlobStore, RepositoryError, Result, validate_key};

/// In-memory implementation of [`BlobStore`].
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for InMemoryBlobStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn exists(&self, key: &str) -> bool {
        validate_key(key).is_ok()
            && self
                .blobs
                .read()
                .map(|blobs| blobs.contains_key(key))
                .unwrap_or(false)
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        blobs.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(blobs.keys().cloned().collect())
    }
}

//! File-based BlobStore implementation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::repository::{BlobStore, RepositoryError, Result, validate_key};

const BLOB_EXTENSION: &str = "blob";
const TEMP_EXTENSION: &str = "blob.tmp";

/// File-based implementation of [`BlobStore`].
///
/// Stores each key as an individual file:
///
/// ```text
/// {base_dir}/
///   Saves_slot1.blob
///   SaveIndex.blob
///   ...
/// ```
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// never leaves a half-written blob behind.
pub struct FileBlobStore {
    base_dir: PathBuf,
}

impl FileBlobStore {
    /// Create a new file-based store rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(RepositoryError::Io)?;
        Ok(Self { base_dir })
    }

    /// Directory holding the blob files.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the path to a blob file.
    fn blob_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", key, BLOB_EXTENSION))
    }
}

impl BlobStore for FileBlobStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        let path = self.blob_path(key);
        let temp_path = path.with_extension(TEMP_EXTENSION);

        fs::write(&temp_path, bytes).map_err(RepositoryError::Io)?;
        fs::rename(&temp_path, &path).map_err(RepositoryError::Io)?;

        tracing::debug!("Saved blob[{}] ({} bytes)", key, bytes.len());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.blob_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(RepositoryError::Io)?;
        tracing::debug!("Loaded blob[{}] ({} bytes)", key, bytes.len());
        Ok(Some(bytes))
    }

    fn exists(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.blob_path(key).exists()
    }

    fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.blob_path(key);

        if path.exists() {
            fs::remove_file(&path).map_err(RepositoryError::Io)?;
            tracing::debug!("Deleted blob[{}]", key);
        }

        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.base_dir).map_err(RepositoryError::Io)? {
            let entry = entry.map_err(RepositoryError::Io)?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some(BLOB_EXTENSION)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                keys.push(stem.to_string());
            }
        }

        keys.sort_unstable();
        Ok(keys)
    }
}

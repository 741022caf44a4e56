//! Blob store doubles for unit tests.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{BlobStore, InMemoryBlobStore, RepositoryError, Result};

/// In-memory store whose writes can be switched to fail, as a full disk would.
#[derive(Default)]
pub(crate) struct WriteFailingStore {
    inner: InMemoryBlobStore,
    fail_writes: AtomicBool,
}

impl WriteFailingStore {
    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(RepositoryError::Io(io::Error::other("disk full")));
        }
        Ok(())
    }
}

impl BlobStore for WriteFailingStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.check_writable()?;
        self.inner.save(key, bytes)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.load(key)
    }

    fn exists(&self, key: &str) -> bool {
        self.inner.exists(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.inner.delete(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys()
    }
}

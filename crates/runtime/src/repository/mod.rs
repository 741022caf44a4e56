//! Repository layer: durable key → bytes storage.
//!
//! Everything the runtime persists goes through a [`BlobStore`]:
//! - Save records and the save index (storage providers)
//! - Leaderboards, stats, achievements (local providers)
//! - Disk-cached remote assets (asset cache)

mod error;
mod file;
mod memory;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{RepositoryError, Result};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::{BlobStore, validate_key};

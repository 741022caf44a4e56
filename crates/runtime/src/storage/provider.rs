//! Data-storage provider contract.

use async_trait::async_trait;

use super::{SaveMetadata, SaveRecord, SyncReport};
use crate::api::{Result, ServiceProvider};
use crate::events::StorageEvent;

/// Save/load backend for the data-storage service.
///
/// Every operation returns a structured [`Result`]; missing slots and an
/// offline cloud are ordinary error values, never panics.
#[async_trait]
pub trait DataStorageProvider: ServiceProvider<StorageEvent> {
    /// Persist `record` under `slot_id` and return the record as stored
    /// (with its refreshed `last_modified`).
    async fn save(&self, slot_id: &str, record: SaveRecord) -> Result<SaveRecord>;

    /// Load the record stored under `slot_id`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`](crate::api::ServiceError::NotFound) if the
    /// slot is absent or empty.
    async fn load(&self, slot_id: &str) -> Result<SaveRecord>;

    /// Delete `slot_id`. Deleting an absent slot succeeds.
    async fn delete(&self, slot_id: &str) -> Result<()>;

    async fn exists(&self, slot_id: &str) -> Result<bool>;

    /// Metadata for every known slot; unreadable slots are skipped.
    async fn list_metadata(&self) -> Result<Vec<SaveMetadata>>;

    /// Push every local save to the cloud.
    ///
    /// Providers without a cloud side report an empty [`SyncReport`].
    async fn sync_with_cloud(&self) -> Result<SyncReport>;
}

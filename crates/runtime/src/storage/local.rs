//! Blob-store-backed save provider.
//!
//! # Key Layout
//!
//! ```text
//! {category}_{slot_id}   serialized SaveRecord (JSON)
//! {index_key}            SaveIndex (JSON)
//! ```
//!
//! All I/O is local, so saves succeed regardless of network state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{DataStorageProvider, SaveIndex, SaveMetadata, SaveRecord, StorageConfig, SyncReport};
use crate::api::{Result, ServiceError, ServiceKind, ServiceProvider};
use crate::events::{EventSink, StorageEvent};
use crate::repository::BlobStore;
use crate::utils::{Clock, SystemClock};

/// Save provider writing records straight into a [`BlobStore`].
pub struct LocalSaveProvider {
    name: String,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    config: StorageConfig,
    /// Refresh `last_modified` on save. Disabled for mirrors.
    stamp: bool,
    initialized: AtomicBool,
    index: Mutex<SaveIndex>,
    events: Mutex<EventSink<StorageEvent>>,
}

impl LocalSaveProvider {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::build("local", store, true)
    }

    /// A provider that stores records exactly as received.
    ///
    /// Used as the remote side of a hybrid setup: a cloud store keeps the
    /// timestamps of the records pushed to it.
    pub fn mirror(store: Arc<dyn BlobStore>) -> Self {
        Self::build("cloud-mirror", store, false)
    }

    fn build(name: &str, store: Arc<dyn BlobStore>, stamp: bool) -> Self {
        Self {
            name: name.to_string(),
            store,
            clock: Arc::new(SystemClock),
            config: StorageConfig::default(),
            stamp,
            initialized: AtomicBool::new(false),
            index: Mutex::new(SaveIndex::default()),
            events: Mutex::new(EventSink::detached()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Snapshot of the slot index.
    pub fn index(&self) -> SaveIndex {
        self.lock_index().clone()
    }

    /// Persist `record` without touching its timestamps.
    ///
    /// Used when adopting a newer remote copy.
    pub(crate) fn persist_verbatim(&self, slot_id: &str, record: &SaveRecord) -> Result<()> {
        self.ensure_initialized()?;
        self.write_record(slot_id, record).map(|_| ())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ServiceError::NotInitialized {
                service: ServiceKind::DataStorage,
            })
        }
    }

    fn validate_slot(slot_id: &str) -> Result<()> {
        if slot_id.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "slot id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn lock_index(&self) -> MutexGuard<'_, SaveIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StorageEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(event);
    }

    fn read_record(&self, slot_id: &str) -> Result<(SaveRecord, usize)> {
        let key = self.config.save_key(slot_id);
        let bytes = match self.store.load(&key)? {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(ServiceError::NotFound(format!("save slot '{}'", slot_id))),
        };
        let record = serde_json::from_slice(&bytes)?;
        Ok((record, bytes.len()))
    }

    /// Write the record blob and register the slot in the index.
    fn write_record(&self, slot_id: &str, record: &SaveRecord) -> Result<usize> {
        let bytes = serde_json::to_vec(record)?;

        let mut index = self.lock_index();
        if let Some(limit) = self.config.max_save_slots
            && !index.contains(slot_id)
            && index.len() >= limit
        {
            return Err(ServiceError::InvalidArgument(format!(
                "save slot limit reached ({} slots)",
                limit
            )));
        }

        self.store.save(&self.config.save_key(slot_id), &bytes)?;
        if index.insert(slot_id) {
            self.persist_index(&index)?;
        }
        Ok(bytes.len())
    }

    fn persist_index(&self, index: &SaveIndex) -> Result<()> {
        let bytes = serde_json::to_vec(index)?;
        self.store.save(&self.config.index_key, &bytes)?;
        Ok(())
    }

    /// Load the index, rebuilding it from stored keys if it is missing or corrupt.
    fn restore_index(&self) -> Result<SaveIndex> {
        if let Some(bytes) = self.store.load(&self.config.index_key)? {
            match serde_json::from_slice::<SaveIndex>(&bytes) {
                Ok(index) => return Ok(index),
                Err(e) => tracing::warn!(
                    "[{}] Save index is corrupt, rebuilding from stored keys: {}",
                    self.name,
                    e
                ),
            }
        }

        let index: SaveIndex = self
            .store
            .keys()?
            .iter()
            .filter_map(|key| self.config.slot_from_key(key))
            .map(str::to_string)
            .collect();
        if !index.is_empty() {
            self.persist_index(&index)?;
        }
        Ok(index)
    }
}

#[async_trait]
impl ServiceProvider<StorageEvent> for LocalSaveProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self, events: EventSink<StorageEvent>) -> Result<()> {
        let index = self.restore_index()?;
        tracing::debug!("[{}] Restored save index ({} slots)", self.name, index.len());

        *self.lock_index() = index;
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn shutdown(&self) {
        self.initialized.store(false, Ordering::Release);
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = EventSink::detached();
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[async_trait]
impl DataStorageProvider for LocalSaveProvider {
    async fn save(&self, slot_id: &str, mut record: SaveRecord) -> Result<SaveRecord> {
        self.ensure_initialized()?;
        Self::validate_slot(slot_id)?;

        if self.stamp {
            let previous = match self.read_record(slot_id) {
                Ok((stored, _)) => Some(stored.last_modified),
                Err(_) => None,
            };
            // Never earlier than the stored copy, even if the clock went back.
            let now = self.clock.now();
            record.last_modified = previous.map_or(now, |previous| previous.max(now));
        }

        match self.write_record(slot_id, &record) {
            Ok(size) => {
                tracing::debug!("[{}] Saved slot {} ({} bytes)", self.name, slot_id, size);
                self.emit(StorageEvent::SaveComplete {
                    slot_id: slot_id.to_string(),
                });
                Ok(record)
            }
            Err(e) => {
                tracing::error!("[{}] Failed to save slot {}: {}", self.name, slot_id, e);
                self.emit(StorageEvent::Error {
                    message: format!("Save failed for {}: {}", slot_id, e),
                });
                Err(e)
            }
        }
    }

    async fn load(&self, slot_id: &str) -> Result<SaveRecord> {
        self.ensure_initialized()?;
        Self::validate_slot(slot_id)?;

        let (record, _) = self.read_record(slot_id)?;
        self.emit(StorageEvent::LoadComplete {
            slot_id: slot_id.to_string(),
        });
        Ok(record)
    }

    async fn delete(&self, slot_id: &str) -> Result<()> {
        self.ensure_initialized()?;
        Self::validate_slot(slot_id)?;

        let mut index = self.lock_index();
        self.store.delete(&self.config.save_key(slot_id))?;
        if index.remove(slot_id) {
            self.persist_index(&index)?;
        }
        tracing::debug!("[{}] Deleted slot {}", self.name, slot_id);
        Ok(())
    }

    async fn exists(&self, slot_id: &str) -> Result<bool> {
        self.ensure_initialized()?;
        Self::validate_slot(slot_id)?;
        Ok(self.store.exists(&self.config.save_key(slot_id)))
    }

    async fn list_metadata(&self) -> Result<Vec<SaveMetadata>> {
        self.ensure_initialized()?;

        let slots = self.lock_index().slots().to_vec();
        let mut metadata = Vec::with_capacity(slots.len());
        for slot_id in slots {
            match self.read_record(&slot_id) {
                Ok((record, size)) => {
                    metadata.push(SaveMetadata::from_record(&slot_id, &record, size))
                }
                Err(e) => tracing::warn!(
                    "[{}] Skipping unreadable slot {}: {}",
                    self.name,
                    slot_id,
                    e
                ),
            }
        }
        Ok(metadata)
    }

    async fn sync_with_cloud(&self) -> Result<SyncReport> {
        self.ensure_initialized()?;
        Ok(SyncReport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryBlobStore;
    use crate::utils::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    async fn provider(store: Arc<InMemoryBlobStore>, clock: Arc<ManualClock>) -> LocalSaveProvider {
        let provider = LocalSaveProvider::new(store).with_clock(clock);
        provider.initialize(EventSink::detached()).await.unwrap();
        provider
    }

    #[tokio::test]
    async fn test_requires_initialization() {
        let provider = LocalSaveProvider::new(Arc::new(InMemoryBlobStore::new()));
        let err = provider.load("slot1").await.unwrap_err();
        assert!(err.is_not_initialized());
    }

    #[tokio::test]
    async fn test_save_stamps_and_indexes() {
        let store = Arc::new(InMemoryBlobStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let provider = provider(Arc::clone(&store), Arc::clone(&clock)).await;

        clock.advance(Duration::seconds(30));
        let saved = provider
            .save("slot1", SaveRecord::new_at("first", start()))
            .await
            .unwrap();
        assert_eq!(saved.last_modified, start() + Duration::seconds(30));

        provider
            .save("slot1", SaveRecord::new_at("again", start()))
            .await
            .unwrap();
        assert_eq!(provider.index().slots(), ["slot1"]);
        assert!(store.exists("Saves_slot1"));
        assert!(store.exists("SaveIndex"));
    }

    #[tokio::test]
    async fn test_stamp_is_monotonic_when_clock_goes_back() {
        let store = Arc::new(InMemoryBlobStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let provider = provider(store, Arc::clone(&clock)).await;

        let first = provider
            .save("slot1", SaveRecord::new_at("s", start()))
            .await
            .unwrap();
        clock.set(start() - Duration::hours(1));
        let second = provider
            .save("slot1", SaveRecord::new_at("s", start() - Duration::hours(2)))
            .await
            .unwrap();
        assert!(second.last_modified >= first.last_modified);
    }

    #[tokio::test]
    async fn test_caller_timestamp_is_replaced() {
        let store = Arc::new(InMemoryBlobStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let provider = provider(store, Arc::clone(&clock)).await;

        let mut record = SaveRecord::new_at("future", start());
        record.last_modified = start() + Duration::days(365);
        let saved = provider.save("slot1", record).await.unwrap();
        assert_eq!(saved.last_modified, start());
        assert_eq!(provider.load("slot1").await.unwrap().last_modified, start());

        clock.advance(Duration::minutes(1));
        let resaved = provider
            .save("slot1", SaveRecord::new_at("next", start()))
            .await
            .unwrap();
        assert_eq!(resaved.last_modified, start() + Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_mirror_preserves_timestamps() {
        let clock = Arc::new(ManualClock::new(start()));
        let mirror = LocalSaveProvider::mirror(Arc::new(InMemoryBlobStore::new()))
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        mirror.initialize(EventSink::detached()).await.unwrap();

        clock.advance(Duration::days(1));
        let record = SaveRecord::new_at("remote", start());
        let stored = mirror.save("slot1", record.clone()).await.unwrap();
        assert_eq!(stored, record);
        assert_eq!(mirror.load("slot1").await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_load_missing_and_empty_slots() {
        let store = Arc::new(InMemoryBlobStore::new());
        let provider = provider(Arc::clone(&store), Arc::new(ManualClock::new(start()))).await;

        assert!(provider.load("nope").await.unwrap_err().is_not_found());

        store.save("Saves_empty", &[]).unwrap();
        assert!(provider.load("empty").await.unwrap_err().is_not_found());

        store.save("Saves_bad", b"{not json").unwrap();
        let err = provider.load("bad").await.unwrap_err();
        assert!(matches!(err, ServiceError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = Arc::new(InMemoryBlobStore::new());
        let provider = provider(Arc::clone(&store), Arc::new(ManualClock::new(start()))).await;

        provider.delete("ghost").await.unwrap();

        provider
            .save("slot1", SaveRecord::new("one"))
            .await
            .unwrap();
        assert!(provider.exists("slot1").await.unwrap());
        provider.delete("slot1").await.unwrap();
        assert!(!provider.exists("slot1").await.unwrap());
        assert!(provider.index().is_empty());
    }

    #[tokio::test]
    async fn test_list_metadata_skips_unreadable() {
        let store = Arc::new(InMemoryBlobStore::new());
        let provider = provider(Arc::clone(&store), Arc::new(ManualClock::new(start()))).await;

        provider.save("a", SaveRecord::new("A")).await.unwrap();
        provider.save("b", SaveRecord::new("B")).await.unwrap();
        store.save("Saves_b", b"garbage").unwrap();

        let metadata = provider.list_metadata().await.unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].slot_id, "a");
        assert_eq!(metadata[0].save_name, "A");
        assert!(metadata[0].size_bytes > 0);
    }

    #[tokio::test]
    async fn test_slot_limit() {
        let store = Arc::new(InMemoryBlobStore::new());
        let provider = LocalSaveProvider::new(store).with_config(StorageConfig {
            max_save_slots: Some(1),
            ..StorageConfig::default()
        });
        provider.initialize(EventSink::detached()).await.unwrap();

        provider.save("a", SaveRecord::new("A")).await.unwrap();
        provider.save("a", SaveRecord::new("A2")).await.unwrap();
        let err = provider.save("b", SaveRecord::new("B")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_index_rebuilt_from_keys() {
        let store = Arc::new(InMemoryBlobStore::new());
        {
            let provider =
                provider(Arc::clone(&store), Arc::new(ManualClock::new(start()))).await;
            provider.save("a", SaveRecord::new("A")).await.unwrap();
        }
        store.save("SaveIndex", b"corrupt").unwrap();

        let provider = provider(store, Arc::new(ManualClock::new(start()))).await;
        assert_eq!(provider.index().slots(), ["a"]);
    }
}

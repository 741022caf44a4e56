//! Data-storage service façade.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{DataStorageProvider, SaveMetadata, SaveRecord, SyncReport};
use crate::api::{Result, Service, ServiceHost, ServiceKind, ServiceState, ServiceType};
use crate::events::{LifecycleEvent, StorageEvent};

/// Save/load entry point used by game code.
///
/// Every call is forwarded to the bound provider and rejected with
/// `NotInitialized` outside the initialized state.
pub struct DataStorageService {
    host: ServiceHost<dyn DataStorageProvider, StorageEvent>,
}

impl DataStorageService {
    pub fn new() -> Self {
        Self {
            host: ServiceHost::new(ServiceKind::DataStorage),
        }
    }

    /// Create a service with `provider` already bound.
    pub fn with_provider(provider: Arc<dyn DataStorageProvider>) -> Result<Self> {
        let service = Self::new();
        service.set_provider(provider)?;
        Ok(service)
    }

    pub fn set_provider(&self, provider: Arc<dyn DataStorageProvider>) -> Result<()> {
        self.host.set_provider(provider)
    }

    pub fn provider(&self) -> Option<Arc<dyn DataStorageProvider>> {
        self.host.provider()
    }

    pub async fn save(&self, slot_id: &str, record: SaveRecord) -> Result<SaveRecord> {
        self.host.ready_provider()?.save(slot_id, record).await
    }

    pub async fn load(&self, slot_id: &str) -> Result<SaveRecord> {
        self.host.ready_provider()?.load(slot_id).await
    }

    pub async fn delete(&self, slot_id: &str) -> Result<()> {
        self.host.ready_provider()?.delete(slot_id).await
    }

    pub async fn exists(&self, slot_id: &str) -> Result<bool> {
        self.host.ready_provider()?.exists(slot_id).await
    }

    pub async fn list_metadata(&self) -> Result<Vec<SaveMetadata>> {
        self.host.ready_provider()?.list_metadata().await
    }

    pub async fn sync_with_cloud(&self) -> Result<SyncReport> {
        self.host.ready_provider()?.sync_with_cloud().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.host.subscribe()
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.host.subscribe_lifecycle()
    }
}

impl Default for DataStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service for DataStorageService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::DataStorage
    }

    fn state(&self) -> ServiceState {
        self.host.state()
    }

    async fn initialize(&self) -> Result<()> {
        self.host.initialize().await
    }

    async fn shutdown(&self) {
        self.host.shutdown().await
    }
}

impl ServiceType for DataStorageService {
    const KIND: ServiceKind = ServiceKind::DataStorage;
}

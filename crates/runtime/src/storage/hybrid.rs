//! Offline-first storage composing a local provider with a remote one.
//!
//! Local storage is authoritative for write availability; the remote is
//! authoritative for freshness on read whenever it is reachable.
//!
//! ```text
//! save:  local (must succeed) ──► dispatch replication (background)
//! load:  local ──► remote (if initialized) ──► newer last_modified wins
//!                                             └─► remote winner written back locally
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{DataStorageProvider, LocalSaveProvider, SaveMetadata, SaveRecord, SyncReport};
use crate::api::{Result, ServiceError, ServiceKind, ServiceProvider};
use crate::events::{EventSink, StorageEvent};
use crate::workers::ReplicationWorker;

/// Options for [`HybridDataStorageProvider`].
#[derive(Debug, Clone)]
pub struct HybridOptions {
    /// Replicate every successful local save to the remote in the background.
    pub auto_sync: bool,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self { auto_sync: true }
    }
}

/// Local-first provider with background cloud replication and read-time
/// conflict resolution.
pub struct HybridDataStorageProvider {
    local: Arc<LocalSaveProvider>,
    remote: Arc<dyn DataStorageProvider>,
    options: HybridOptions,
    initialized: AtomicBool,
    events: Mutex<EventSink<StorageEvent>>,
    replication: ReplicationWorker,
}

impl HybridDataStorageProvider {
    pub fn new(local: Arc<LocalSaveProvider>, remote: Arc<dyn DataStorageProvider>) -> Self {
        Self::with_options(local, remote, HybridOptions::default())
    }

    pub fn with_options(
        local: Arc<LocalSaveProvider>,
        remote: Arc<dyn DataStorageProvider>,
        options: HybridOptions,
    ) -> Self {
        Self {
            local,
            remote,
            options,
            initialized: AtomicBool::new(false),
            events: Mutex::new(EventSink::detached()),
            replication: ReplicationWorker::new(),
        }
    }

    pub fn local(&self) -> &Arc<LocalSaveProvider> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn DataStorageProvider> {
        &self.remote
    }

    /// Wait for every in-flight replication.
    ///
    /// Returns how many replications failed since the previous flush.
    pub async fn flush_pending(&self) -> usize {
        self.replication.flush().await
    }

    /// Replications dispatched but not yet finished.
    pub fn pending_count(&self) -> usize {
        self.replication.pending()
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

    fn sink(&self) -> EventSink<StorageEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, event: StorageEvent) {
        self.sink().emit(event);
    }

    /// Report a remote failure that did not fail the calling operation.
    fn report_remote_error(&self, error: &ServiceError) {
        self.emit(StorageEvent::Error {
            message: format!("Cloud: {}", error),
        });
    }

    /// Resolve a local load result against the remote copy.
    async fn reconcile(
        &self,
        slot_id: &str,
        local: Result<SaveRecord>,
    ) -> Result<SaveRecord> {
        if !self.remote.is_initialized() {
            return local;
        }

        let remote = match self.remote.load(slot_id).await {
            Ok(remote) => remote,
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!("Cloud load of slot {} failed, using local: {}", slot_id, e);
                    self.report_remote_error(&e);
                }
                return local;
            }
        };

        let remote_wins = match &local {
            Ok(local) => remote.last_modified > local.last_modified,
            Err(e) => {
                tracing::debug!("Local load of slot {} failed ({}), adopting cloud copy", slot_id, e);
                true
            }
        };
        if !remote_wins {
            return local;
        }

        tracing::info!(
            "Cloud copy of slot {} is newer ({}), updating local",
            slot_id,
            remote.last_modified
        );
        if let Err(e) = self.local.persist_verbatim(slot_id, &remote) {
            tracing::warn!("Failed to write cloud copy of slot {} locally: {}", slot_id, e);
        }
        Ok(remote)
    }
}

#[async_trait]
impl ServiceProvider<StorageEvent> for HybridDataStorageProvider {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn initialize(&self, events: EventSink<StorageEvent>) -> Result<()> {
        if !self.local.is_initialized() {
            self.local.initialize(EventSink::detached()).await?;
        }

        if !self.remote.is_initialized()
            && let Err(e) = self.remote.initialize(EventSink::detached()).await
        {
            tracing::warn!(
                "Cloud provider {} unavailable, continuing offline: {}",
                self.remote.name(),
                e
            );
        }

        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn shutdown(&self) {
        let failed = self.replication.flush().await;
        if failed > 0 {
            tracing::warn!("{} cloud replications failed before shutdown", failed);
        }

        self.initialized.store(false, Ordering::Release);
        self.remote.shutdown().await;
        self.local.shutdown().await;
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = EventSink::detached();
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[async_trait]
impl DataStorageProvider for HybridDataStorageProvider {
    async fn save(&self, slot_id: &str, record: SaveRecord) -> Result<SaveRecord> {
        self.ensure_initialized()?;

        let saved = match self.local.save(slot_id, record).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!("Local save of slot {} failed: {}", slot_id, e);
                self.emit(StorageEvent::Error {
                    message: format!("Save failed for {}: {}", slot_id, e),
                });
                return Err(e);
            }
        };

        if self.options.auto_sync && self.remote.is_initialized() {
            self.replication.dispatch(
                Arc::clone(&self.remote),
                slot_id.to_string(),
                saved.clone(),
                self.sink(),
            );
        }

        self.emit(StorageEvent::SaveComplete {
            slot_id: slot_id.to_string(),
        });
        Ok(saved)
    }

    async fn load(&self, slot_id: &str) -> Result<SaveRecord> {
        self.ensure_initialized()?;

        let local = self.local.load(slot_id).await;
        let record = self.reconcile(slot_id, local).await?;

        self.emit(StorageEvent::LoadComplete {
            slot_id: slot_id.to_string(),
        });
        Ok(record)
    }

    async fn delete(&self, slot_id: &str) -> Result<()> {
        self.ensure_initialized()?;

        self.local.delete(slot_id).await?;
        if self.remote.is_initialized()
            && let Err(e) = self.remote.delete(slot_id).await
        {
            tracing::warn!("Cloud delete of slot {} failed: {}", slot_id, e);
            self.report_remote_error(&e);
        }
        Ok(())
    }

    async fn exists(&self, slot_id: &str) -> Result<bool> {
        self.ensure_initialized()?;

        if self.local.exists(slot_id).await? {
            return Ok(true);
        }
        if !self.remote.is_initialized() {
            return Ok(false);
        }
        match self.remote.exists(slot_id).await {
            Ok(exists) => Ok(exists),
            Err(e) => {
                tracing::warn!("Cloud exists check for slot {} failed: {}", slot_id, e);
                self.report_remote_error(&e);
                Ok(false)
            }
        }
    }

    async fn list_metadata(&self) -> Result<Vec<SaveMetadata>> {
        self.ensure_initialized()?;
        self.local.list_metadata().await
    }

    async fn sync_with_cloud(&self) -> Result<SyncReport> {
        self.ensure_initialized()?;

        if !self.remote.is_initialized() {
            return Err(ServiceError::RemoteUnavailable(format!(
                "cloud provider {} not initialized",
                self.remote.name()
            )));
        }

        let metadata = self.local.list_metadata().await?;
        let mut report = SyncReport::default();

        for meta in metadata {
            let pushed = match self.local.load(&meta.slot_id).await {
                Ok(record) => self.remote.save(&meta.slot_id, record).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match pushed {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Failed to sync slot {}: {}", meta.slot_id, e);
                }
            }
        }

        tracing::info!(
            "Cloud sync complete: {} synced, {} failed",
            report.synced,
            report.failed
        );
        self.emit(StorageEvent::SyncComplete {
            synced: report.synced,
            failed: report.failed,
        });
        Ok(report)
    }
}

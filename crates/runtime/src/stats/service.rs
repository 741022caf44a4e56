//! Stats service façade.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{PlayerStats, Stat, StatsProvider};
use crate::api::{Result, Service, ServiceHost, ServiceKind, ServiceState, ServiceType};
use crate::events::{LifecycleEvent, StatsEvent};

pub struct StatsService {
    host: ServiceHost<dyn StatsProvider, StatsEvent>,
}

impl StatsService {
    pub fn new() -> Self {
        Self {
            host: ServiceHost::new(ServiceKind::Stats),
        }
    }

    pub fn with_provider(provider: Arc<dyn StatsProvider>) -> Result<Self> {
        let service = Self::new();
        service.set_provider(provider)?;
        Ok(service)
    }

    pub fn set_provider(&self, provider: Arc<dyn StatsProvider>) -> Result<()> {
        self.host.set_provider(provider)
    }

    pub async fn define_stats(&self, definitions: Vec<Stat>) -> Result<()> {
        self.host.ready_provider()?.define_stats(definitions).await
    }

    pub async fn set_stat(&self, stat_id: &str, value: f64) -> Result<()> {
        self.host.ready_provider()?.set_stat(stat_id, value).await
    }

    /// Fold `by` into the stat and return its new value.
    pub async fn increment_stat(&self, stat_id: &str, by: f64) -> Result<f64> {
        self.host.ready_provider()?.increment_stat(stat_id, by).await
    }

    pub async fn get_stat(&self, stat_id: &str) -> Result<f64> {
        self.host.ready_provider()?.get_stat(stat_id).await
    }

    pub async fn get_all_stats(&self) -> Result<PlayerStats> {
        self.host.ready_provider()?.get_all_stats().await
    }

    pub async fn reset_stat(&self, stat_id: &str) -> Result<()> {
        self.host.ready_provider()?.reset_stat(stat_id).await
    }

    pub async fn reset_all_stats(&self) -> Result<()> {
        self.host.ready_provider()?.reset_all_stats().await
    }

    pub async fn sync_stats(&self) -> Result<()> {
        self.host.ready_provider()?.sync_stats().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatsEvent> {
        self.host.subscribe()
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.host.subscribe_lifecycle()
    }
}

impl Default for StatsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service for StatsService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Stats
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

impl ServiceType for StatsService {
    const KIND: ServiceKind = ServiceKind::Stats;
}

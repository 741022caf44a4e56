//! Achievements service façade.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Achievement, AchievementsProvider, PlayerAchievements};
use crate::api::{Result, Service, ServiceHost, ServiceKind, ServiceState, ServiceType};
use crate::events::{AchievementEvent, LifecycleEvent};

pub struct AchievementsService {
    host: ServiceHost<dyn AchievementsProvider, AchievementEvent>,
}

impl AchievementsService {
    pub fn new() -> Self {
        Self {
            host: ServiceHost::new(ServiceKind::Achievements),
        }
    }

    pub fn with_provider(provider: Arc<dyn AchievementsProvider>) -> Result<Self> {
        let service = Self::new();
        service.set_provider(provider)?;
        Ok(service)
    }

    pub fn set_provider(&self, provider: Arc<dyn AchievementsProvider>) -> Result<()> {
        self.host.set_provider(provider)
    }

    pub async fn define_achievements(&self, definitions: Vec<Achievement>) -> Result<()> {
        self.host
            .ready_provider()?
            .define_achievements(definitions)
            .await
    }

    pub async fn unlock(&self, achievement_id: &str) -> Result<()> {
        self.host.ready_provider()?.unlock(achievement_id).await
    }

    pub async fn set_progress(&self, achievement_id: &str, progress: f64) -> Result<()> {
        self.host
            .ready_provider()?
            .set_progress(achievement_id, progress)
            .await
    }

    pub async fn increment_progress(&self, achievement_id: &str, by: f64) -> Result<()> {
        self.host
            .ready_provider()?
            .increment_progress(achievement_id, by)
            .await
    }

    pub async fn get_achievement(&self, achievement_id: &str) -> Result<Achievement> {
        self.host
            .ready_provider()?
            .get_achievement(achievement_id)
            .await
    }

    pub async fn get_all(&self) -> Result<PlayerAchievements> {
        self.host.ready_provider()?.get_all().await
    }

    pub async fn is_unlocked(&self, achievement_id: &str) -> Result<bool> {
        self.host.ready_provider()?.is_unlocked(achievement_id).await
    }

    /// Percentage of tracked achievements that are unlocked.
    pub async fn completion_percentage(&self) -> Result<f64> {
        Ok(self.get_all().await?.completion_percentage())
    }

    pub async fn reset_all(&self) -> Result<()> {
        self.host.ready_provider()?.reset_all().await
    }

    pub async fn sync_achievements(&self) -> Result<()> {
        self.host.ready_provider()?.sync_achievements().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AchievementEvent> {
        self.host.subscribe()
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.host.subscribe_lifecycle()
    }
}

impl Default for AchievementsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service for AchievementsService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Achievements
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

impl ServiceType for AchievementsService {
    const KIND: ServiceKind = ServiceKind::Achievements;
}

//! Leaderboards service façade.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Leaderboard, LeaderboardDefinition, LeaderboardsProvider, ScoreSubmission, SubmitOutcome};
use crate::api::{Result, Service, ServiceHost, ServiceKind, ServiceState, ServiceType};
use crate::events::{LeaderboardEvent, LifecycleEvent};

pub struct LeaderboardsService {
    host: ServiceHost<dyn LeaderboardsProvider, LeaderboardEvent>,
}

impl LeaderboardsService {
    pub fn new() -> Self {
        Self {
            host: ServiceHost::new(ServiceKind::Leaderboards),
        }
    }

    pub fn with_provider(provider: Arc<dyn LeaderboardsProvider>) -> Result<Self> {
        let service = Self::new();
        service.set_provider(provider)?;
        Ok(service)
    }

    pub fn set_provider(&self, provider: Arc<dyn LeaderboardsProvider>) -> Result<()> {
        self.host.set_provider(provider)
    }

    pub async fn define_leaderboards(&self, definitions: Vec<LeaderboardDefinition>) -> Result<()> {
        self.host
            .ready_provider()?
            .define_leaderboards(definitions)
            .await
    }

    pub async fn submit_score(
        &self,
        leaderboard_id: &str,
        submission: ScoreSubmission,
    ) -> Result<SubmitOutcome> {
        self.host
            .ready_provider()?
            .submit_score(leaderboard_id, submission)
            .await
    }

    pub async fn get_leaderboard(
        &self,
        leaderboard_id: &str,
        max_entries: usize,
    ) -> Result<Leaderboard> {
        self.host
            .ready_provider()?
            .get_leaderboard(leaderboard_id, max_entries)
            .await
    }

    pub async fn get_player_rank(&self, leaderboard_id: &str, user_id: &str) -> Result<u32> {
        self.host
            .ready_provider()?
            .get_player_rank(leaderboard_id, user_id)
            .await
    }

    pub async fn get_player_score(&self, leaderboard_id: &str, user_id: &str) -> Result<i64> {
        self.host
            .ready_provider()?
            .get_player_score(leaderboard_id, user_id)
            .await
    }

    pub async fn reset_all(&self) -> Result<()> {
        self.host.ready_provider()?.reset_all().await
    }

    pub async fn sync_leaderboards(&self) -> Result<()> {
        self.host.ready_provider()?.sync_leaderboards().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeaderboardEvent> {
        self.host.subscribe()
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.host.subscribe_lifecycle()
    }
}

impl Default for LeaderboardsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service for LeaderboardsService {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Leaderboards
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

impl ServiceType for LeaderboardsService {
    const KIND: ServiceKind = ServiceKind::Leaderboards;
}

//! Leaderboards provider contract and the blob-store-backed implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{
    Leaderboard, LeaderboardDefinition, LeaderboardEngine, ScoreSubmission, SortOrder,
    SubmitOutcome,
};
use crate::api::{Result, ServiceError, ServiceKind, ServiceProvider};
use crate::events::{EventSink, LeaderboardEvent};
use crate::repository::BlobStore;
use crate::utils::{Clock, SystemClock};

#[async_trait]
pub trait LeaderboardsProvider: ServiceProvider<LeaderboardEvent> {
    /// Register boards, keeping any that already exist.
    async fn define_leaderboards(&self, definitions: Vec<LeaderboardDefinition>) -> Result<()>;

    async fn submit_score(
        &self,
        leaderboard_id: &str,
        submission: ScoreSubmission,
    ) -> Result<SubmitOutcome>;

    /// Snapshot holding the top `max_entries` entries.
    async fn get_leaderboard(&self, leaderboard_id: &str, max_entries: usize)
    -> Result<Leaderboard>;

    async fn get_player_rank(&self, leaderboard_id: &str, user_id: &str) -> Result<u32>;

    async fn get_player_score(&self, leaderboard_id: &str, user_id: &str) -> Result<i64>;

    /// Clear every board's entries, keeping definitions.
    async fn reset_all(&self) -> Result<()>;

    async fn sync_leaderboards(&self) -> Result<()>;
}

/// Leaderboards provider tunables.
#[derive(Debug, Clone)]
pub struct LeaderboardsConfig {
    /// Order for boards created implicitly by a submission.
    pub default_sort_order: SortOrder,

    /// Blob key prefix; each board is stored as `{key_prefix}_{id}`.
    pub key_prefix: String,
}

impl Default for LeaderboardsConfig {
    fn default() -> Self {
        Self {
            default_sort_order: SortOrder::Descending,
            key_prefix: "leaderboards".to_string(),
        }
    }
}

/// Device-local leaderboards persisted to a [`BlobStore`].
pub struct LocalLeaderboardsProvider {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    config: LeaderboardsConfig,
    engine: Mutex<LeaderboardEngine>,
    initialized: AtomicBool,
    events: Mutex<EventSink<LeaderboardEvent>>,
}

impl LocalLeaderboardsProvider {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_config(store, LeaderboardsConfig::default())
    }

    pub fn with_config(store: Arc<dyn BlobStore>, config: LeaderboardsConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            engine: Mutex::new(LeaderboardEngine::new(config.default_sort_order)),
            config,
            initialized: AtomicBool::new(false),
            events: Mutex::new(EventSink::detached()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn board_key(&self, leaderboard_id: &str) -> String {
        format!("{}_{}", self.config.key_prefix, leaderboard_id)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ServiceError::NotInitialized {
                service: ServiceKind::Leaderboards,
            })
        }
    }

    fn lock_engine(&self) -> MutexGuard<'_, LeaderboardEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LeaderboardEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(event);
    }

    fn persist(&self, board: &Leaderboard) -> Result<()> {
        let bytes = serde_json::to_vec(board)?;
        self.store.save(&self.board_key(&board.id), &bytes)?;
        Ok(())
    }

    fn restore(&self) -> Result<LeaderboardEngine> {
        let mut engine = LeaderboardEngine::new(self.config.default_sort_order);
        let prefix = format!("{}_", self.config.key_prefix);

        for key in self.store.keys()? {
            if !key.starts_with(&prefix) {
                continue;
            }
            let Some(bytes) = self.store.load(&key)? else {
                continue;
            };
            match serde_json::from_slice::<Leaderboard>(&bytes) {
                Ok(board) => engine.restore(board),
                Err(e) => tracing::warn!("Skipping unreadable leaderboard blob {}: {}", key, e),
            }
        }
        Ok(engine)
    }
}

#[async_trait]
impl ServiceProvider<LeaderboardEvent> for LocalLeaderboardsProvider {
    fn name(&self) -> &str {
        "local-leaderboards"
    }

    async fn initialize(&self, events: EventSink<LeaderboardEvent>) -> Result<()> {
        let engine = self.restore()?;
        tracing::debug!("Restored {} leaderboards", engine.len());

        *self.lock_engine() = engine;
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
impl LeaderboardsProvider for LocalLeaderboardsProvider {
    async fn define_leaderboards(&self, definitions: Vec<LeaderboardDefinition>) -> Result<()> {
        self.ensure_initialized()?;

        let mut engine = self.lock_engine();
        let mut staged = engine.clone();
        for id in staged.define(definitions) {
            self.persist(staged.get(&id)?)?;
            tracing::debug!("Defined leaderboard {}", id);
        }
        *engine = staged;
        Ok(())
    }

    async fn submit_score(
        &self,
        leaderboard_id: &str,
        submission: ScoreSubmission,
    ) -> Result<SubmitOutcome> {
        self.ensure_initialized()?;

        let score = submission.score;
        let outcome = {
            let mut engine = self.lock_engine();
            let mut board = engine.stage(leaderboard_id, &submission)?;
            let outcome = board.submit(submission, self.clock.now());
            if outcome != SubmitOutcome::Unchanged {
                self.persist(&board)?;
                engine.commit(board);
            }
            outcome
        };

        tracing::debug!(
            "Score {} on {}: {:?}",
            score,
            leaderboard_id,
            outcome
        );
        self.emit(LeaderboardEvent::ScoreSubmitted {
            leaderboard_id: leaderboard_id.to_string(),
            score,
        });
        Ok(outcome)
    }

    async fn get_leaderboard(
        &self,
        leaderboard_id: &str,
        max_entries: usize,
    ) -> Result<Leaderboard> {
        self.ensure_initialized()?;

        let snapshot = self.lock_engine().top(leaderboard_id, max_entries)?;
        self.emit(LeaderboardEvent::LeaderboardLoaded {
            leaderboard_id: leaderboard_id.to_string(),
        });
        Ok(snapshot)
    }

    async fn get_player_rank(&self, leaderboard_id: &str, user_id: &str) -> Result<u32> {
        self.ensure_initialized()?;
        self.lock_engine().rank_of(leaderboard_id, user_id)
    }

    async fn get_player_score(&self, leaderboard_id: &str, user_id: &str) -> Result<i64> {
        self.ensure_initialized()?;
        self.lock_engine().score_of(leaderboard_id, user_id)
    }

    async fn reset_all(&self) -> Result<()> {
        self.ensure_initialized()?;

        let mut engine = self.lock_engine();
        let mut staged = engine.clone();
        staged.reset_all(self.clock.now());
        for board in staged.boards() {
            self.persist(board)?;
        }
        tracing::info!("Reset {} leaderboards", staged.len());
        *engine = staged;
        Ok(())
    }

    async fn sync_leaderboards(&self) -> Result<()> {
        self.ensure_initialized()
    }
}

//! Achievements provider contract and the blob-store-backed implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Achievement, PlayerAchievements, ProgressUpdate};
use crate::api::{Result, ServiceError, ServiceKind, ServiceProvider};
use crate::events::{AchievementEvent, EventSink};
use crate::repository::BlobStore;
use crate::utils::{Clock, SystemClock};

const ACHIEVEMENTS_KEY: &str = "achievements";

#[async_trait]
pub trait AchievementsProvider: ServiceProvider<AchievementEvent> {
    /// Register achievement definitions; tracked achievements keep their state.
    async fn define_achievements(&self, definitions: Vec<Achievement>) -> Result<()>;

    async fn unlock(&self, achievement_id: &str) -> Result<()>;

    async fn set_progress(&self, achievement_id: &str, progress: f64) -> Result<()>;

    async fn increment_progress(&self, achievement_id: &str, by: f64) -> Result<()>;

    async fn get_achievement(&self, achievement_id: &str) -> Result<Achievement>;

    async fn get_all(&self) -> Result<PlayerAchievements>;

    async fn is_unlocked(&self, achievement_id: &str) -> Result<bool>;

    async fn reset_all(&self) -> Result<()>;

    async fn sync_achievements(&self) -> Result<()>;
}

#[derive(Default)]
struct AchievementsState {
    definitions: HashMap<String, Achievement>,
    player: PlayerAchievements,
}

impl AchievementsState {
    /// Copy of a tracked achievement, created from its definition if untracked.
    fn staged(&self, achievement_id: &str) -> Achievement {
        match (
            self.player.get(achievement_id),
            self.definitions.get(achievement_id),
        ) {
            (Some(achievement), _) => achievement.clone(),
            (None, Some(definition)) => definition.instantiate(),
            (None, None) => Achievement::new(achievement_id, achievement_id, "No description"),
        }
    }

    /// Player state with `achievement` stored, stamped at `now`.
    fn with_stored(&self, achievement: Achievement, now: DateTime<Utc>) -> PlayerAchievements {
        let mut player = self.player.clone();
        player
            .achievements
            .insert(achievement.achievement_id.clone(), achievement);
        player.last_updated = Some(now);
        player
    }
}

fn ensure_finite(what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ServiceError::InvalidArgument(format!(
            "{} must be finite, got {}",
            what, value
        )))
    }
}

/// Device-local achievements persisted under a single blob key.
pub struct LocalAchievementsProvider {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<AchievementsState>,
    initialized: AtomicBool,
    events: Mutex<EventSink<AchievementEvent>>,
}

impl LocalAchievementsProvider {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            state: Mutex::new(AchievementsState::default()),
            initialized: AtomicBool::new(false),
            events: Mutex::new(EventSink::detached()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ServiceError::NotInitialized {
                service: ServiceKind::Achievements,
            })
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AchievementsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AchievementEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(event);
    }

    fn persist(&self, player: &PlayerAchievements) -> Result<()> {
        let bytes = serde_json::to_vec(player)?;
        self.store.save(ACHIEVEMENTS_KEY, &bytes)?;
        Ok(())
    }

    /// Move progress to `target(current)`, persist, and publish the outcome.
    fn update_progress(&self, achievement_id: &str, target: impl FnOnce(f64) -> f64) -> Result<()> {
        if achievement_id.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "achievement id must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let (update, snapshot) = {
            let mut state = self.lock_state();
            let mut achievement = state.staged(achievement_id);
            let progress = target(achievement.progress);
            ensure_finite("progress", progress)?;

            let update = achievement.set_progress(progress, now);
            if update != ProgressUpdate::Ignored {
                let player = state.with_stored(achievement.clone(), now);
                self.persist(&player)?;
                state.player = player;
            }
            (update, achievement)
        };

        match update {
            ProgressUpdate::Ignored => {}
            ProgressUpdate::Progressed(progress) => self.emit(AchievementEvent::Progress {
                achievement_id: achievement_id.to_string(),
                progress,
            }),
            ProgressUpdate::Unlocked => {
                self.emit(AchievementEvent::Progress {
                    achievement_id: achievement_id.to_string(),
                    progress: snapshot.progress,
                });
                tracing::info!("Achievement unlocked: {}", achievement_id);
                self.emit(AchievementEvent::Unlocked(Box::new(snapshot)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceProvider<AchievementEvent> for LocalAchievementsProvider {
    fn name(&self) -> &str {
        "local-achievements"
    }

    async fn initialize(&self, events: EventSink<AchievementEvent>) -> Result<()> {
        let player = match self.store.load(ACHIEVEMENTS_KEY)? {
            Some(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).map_err(|e| {
                tracing::error!("Stored achievements are unreadable, refusing to start: {}", e);
                ServiceError::Serialization(format!("stored achievements: {}", e))
            })?,
            _ => PlayerAchievements::default(),
        };
        tracing::debug!("Loaded {} achievements", player.len());

        self.lock_state().player = player;
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn shutdown(&self) {
        if self.initialized.swap(false, Ordering::AcqRel)
            && let Err(e) = self.persist(&self.lock_state().player)
        {
            tracing::error!("Failed to persist achievements on shutdown: {}", e);
        }
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = EventSink::detached();
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[async_trait]
impl AchievementsProvider for LocalAchievementsProvider {
    async fn define_achievements(&self, definitions: Vec<Achievement>) -> Result<()> {
        self.ensure_initialized()?;

        for definition in &definitions {
            ensure_finite(
                &format!("max progress of achievement '{}'", definition.achievement_id),
                definition.max_progress,
            )?;
        }

        let mut state = self.lock_state();
        let mut player = state.player.clone();
        for definition in &definitions {
            if !player.contains(&definition.achievement_id) {
                player
                    .achievements
                    .insert(definition.achievement_id.clone(), definition.instantiate());
            }
        }
        self.persist(&player)?;

        state.player = player;
        for definition in definitions {
            state
                .definitions
                .insert(definition.achievement_id.clone(), definition);
        }
        Ok(())
    }

    async fn unlock(&self, achievement_id: &str) -> Result<()> {
        self.ensure_initialized()?;
        if achievement_id.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "achievement id must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let unlocked = {
            let mut state = self.lock_state();
            let mut achievement = state.staged(achievement_id);
            if !achievement.unlock(now) {
                return Ok(());
            }
            let player = state.with_stored(achievement.clone(), now);
            self.persist(&player)?;
            state.player = player;
            achievement
        };

        tracing::info!("Achievement unlocked: {}", achievement_id);
        self.emit(AchievementEvent::Unlocked(Box::new(unlocked)));
        Ok(())
    }

    async fn set_progress(&self, achievement_id: &str, progress: f64) -> Result<()> {
        self.ensure_initialized()?;
        ensure_finite("progress", progress)?;
        self.update_progress(achievement_id, |_| progress)
    }

    async fn increment_progress(&self, achievement_id: &str, by: f64) -> Result<()> {
        self.ensure_initialized()?;
        ensure_finite("progress increment", by)?;
        self.update_progress(achievement_id, |current| current + by)
    }

    async fn get_achievement(&self, achievement_id: &str) -> Result<Achievement> {
        self.ensure_initialized()?;
        self.lock_state()
            .player
            .get(achievement_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("achievement '{}'", achievement_id)))
    }

    async fn get_all(&self) -> Result<PlayerAchievements> {
        self.ensure_initialized()?;
        Ok(self.lock_state().player.clone())
    }

    async fn is_unlocked(&self, achievement_id: &str) -> Result<bool> {
        self.ensure_initialized()?;
        Ok(self
            .lock_state()
            .player
            .get(achievement_id)
            .is_some_and(|a| a.is_unlocked))
    }

    async fn reset_all(&self) -> Result<()> {
        self.ensure_initialized()?;

        let mut state = self.lock_state();
        let mut player = state.player.clone();
        player.achievements.values_mut().for_each(Achievement::reset);
        player.last_updated = Some(self.clock.now());
        self.persist(&player)?;
        state.player = player;
        Ok(())
    }

    async fn sync_achievements(&self) -> Result<()> {
        self.ensure_initialized()?;
        self.emit(AchievementEvent::Synced);
        Ok(())
    }
}

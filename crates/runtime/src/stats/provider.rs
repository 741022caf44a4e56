//! Stats provider contract and the blob-store-backed implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{PlayerStats, Stat, StatKind};
use crate::api::{Result, ServiceError, ServiceKind, ServiceProvider};
use crate::events::{EventSink, StatsEvent};
use crate::repository::BlobStore;
use crate::utils::{Clock, SystemClock};

const STATS_KEY: &str = "stats";

#[async_trait]
pub trait StatsProvider: ServiceProvider<StatsEvent> {
    /// Register stat definitions; stats already tracked keep their values.
    async fn define_stats(&self, definitions: Vec<Stat>) -> Result<()>;

    async fn set_stat(&self, stat_id: &str, value: f64) -> Result<()>;

    async fn increment_stat(&self, stat_id: &str, by: f64) -> Result<f64>;

    async fn get_stat(&self, stat_id: &str) -> Result<f64>;

    async fn get_all_stats(&self) -> Result<PlayerStats>;

    async fn reset_stat(&self, stat_id: &str) -> Result<()>;

    async fn reset_all_stats(&self) -> Result<()>;

    async fn sync_stats(&self) -> Result<()>;
}

#[derive(Default)]
struct StatsState {
    definitions: HashMap<String, Stat>,
    player: PlayerStats,
}

impl StatsState {
    /// Copy of a tracked stat, created from its definition (or as a `Float`)
    /// if it has never been written.
    fn staged(&self, stat_id: &str) -> Stat {
        match (self.player.get(stat_id), self.definitions.get(stat_id)) {
            (Some(stat), _) => stat.clone(),
            (None, Some(definition)) => definition.instantiate(),
            (None, None) => Stat::new(stat_id, stat_id, StatKind::Float),
        }
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

/// Device-local stats persisted under a single blob key.
pub struct LocalStatsProvider {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<StatsState>,
    initialized: AtomicBool,
    events: Mutex<EventSink<StatsEvent>>,
}

impl LocalStatsProvider {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            state: Mutex::new(StatsState::default()),
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
                service: ServiceKind::Stats,
            })
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StatsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StatsEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(event);
    }

    fn persist(&self, player: &PlayerStats) -> Result<()> {
        let bytes = serde_json::to_vec(player)?;
        self.store.save(STATS_KEY, &bytes)?;
        Ok(())
    }

    /// Apply `update` to a copy of the stat, persist, then publish the new value.
    ///
    /// Nothing changes in memory unless the write succeeds.
    fn update(&self, stat_id: &str, update: impl FnOnce(&mut Stat)) -> Result<f64> {
        if stat_id.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "stat id must not be empty".to_string(),
            ));
        }

        let value = {
            let mut state = self.lock_state();
            let mut stat = state.staged(stat_id);
            update(&mut stat);
            ensure_finite(&format!("stat '{}'", stat_id), stat.value)?;

            let value = stat.value;
            let mut player = state.player.clone();
            player.stats.insert(stat_id.to_string(), stat);
            player.last_updated = Some(self.clock.now());
            self.persist(&player)?;
            state.player = player;
            value
        };

        self.emit(StatsEvent::StatUpdated {
            stat_id: stat_id.to_string(),
            value,
        });
        Ok(value)
    }
}

#[async_trait]
impl ServiceProvider<StatsEvent> for LocalStatsProvider {
    fn name(&self) -> &str {
        "local-stats"
    }

    async fn initialize(&self, events: EventSink<StatsEvent>) -> Result<()> {
        let player = match self.store.load(STATS_KEY)? {
            Some(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).map_err(|e| {
                tracing::error!("Stored stats are unreadable, refusing to start: {}", e);
                ServiceError::Serialization(format!("stored stats: {}", e))
            })?,
            _ => PlayerStats::default(),
        };
        tracing::debug!("Loaded {} stats", player.len());

        self.lock_state().player = player;
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn shutdown(&self) {
        if self.initialized.swap(false, Ordering::AcqRel)
            && let Err(e) = self.persist(&self.lock_state().player)
        {
            tracing::error!("Failed to persist stats on shutdown: {}", e);
        }
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = EventSink::detached();
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[async_trait]
impl StatsProvider for LocalStatsProvider {
    async fn define_stats(&self, definitions: Vec<Stat>) -> Result<()> {
        self.ensure_initialized()?;

        for definition in &definitions {
            ensure_finite(
                &format!("default value of stat '{}'", definition.stat_id),
                definition.default_value,
            )?;
        }

        let mut state = self.lock_state();
        let mut player = state.player.clone();
        for definition in &definitions {
            if !player.contains(&definition.stat_id) {
                player
                    .stats
                    .insert(definition.stat_id.clone(), definition.instantiate());
            }
        }
        self.persist(&player)?;

        state.player = player;
        for definition in definitions {
            state
                .definitions
                .insert(definition.stat_id.clone(), definition);
        }
        Ok(())
    }

    async fn set_stat(&self, stat_id: &str, value: f64) -> Result<()> {
        self.ensure_initialized()?;
        ensure_finite("stat value", value)?;
        self.update(stat_id, |stat| stat.set(value)).map(|_| ())
    }

    async fn increment_stat(&self, stat_id: &str, by: f64) -> Result<f64> {
        self.ensure_initialized()?;
        ensure_finite("stat increment", by)?;
        self.update(stat_id, |stat| stat.increment(by))
    }

    async fn get_stat(&self, stat_id: &str) -> Result<f64> {
        self.ensure_initialized()?;
        self.lock_state()
            .player
            .get(stat_id)
            .map(|stat| stat.value)
            .ok_or_else(|| ServiceError::NotFound(format!("stat '{}'", stat_id)))
    }

    async fn get_all_stats(&self) -> Result<PlayerStats> {
        self.ensure_initialized()?;
        Ok(self.lock_state().player.clone())
    }

    async fn reset_stat(&self, stat_id: &str) -> Result<()> {
        self.ensure_initialized()?;

        let value = {
            let mut state = self.lock_state();
            let mut player = state.player.clone();
            let stat = player
                .stats
                .get_mut(stat_id)
                .ok_or_else(|| ServiceError::NotFound(format!("stat '{}'", stat_id)))?;
            stat.reset();
            let value = stat.value;
            self.persist(&player)?;
            state.player = player;
            value
        };

        self.emit(StatsEvent::StatUpdated {
            stat_id: stat_id.to_string(),
            value,
        });
        Ok(())
    }

    async fn reset_all_stats(&self) -> Result<()> {
        self.ensure_initialized()?;

        let mut state = self.lock_state();
        let mut player = state.player.clone();
        player.stats.values_mut().for_each(Stat::reset);
        player.last_updated = Some(self.clock.now());
        self.persist(&player)?;
        state.player = player;
        Ok(())
    }

    async fn sync_stats(&self) -> Result<()> {
        self.ensure_initialized()?;
        self.emit(StatsEvent::StatsSynced);
        Ok(())
    }
}

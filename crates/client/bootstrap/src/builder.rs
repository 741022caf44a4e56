//! Assembles the service context and asset cache used by clients.
use std::sync::Arc;

use anyhow::{Context, Result};
use playkit_runtime::{
    AccountService, AchievementsService, AssetCache, AssetDecoder, AssetFetcher, BlobStore, Clock,
    DataStorageService, FileBlobStore, LeaderboardsService, LocalAccountProvider,
    LocalAchievementsProvider, LocalLeaderboardsProvider, LocalStatsProvider, ServiceContext,
    StatsService, StorageBackends, StorageConfig, StorageMode, SystemClock,
    create_storage_provider,
};

use crate::config::PlaykitConfig;

/// Builder that binds every service to its provider under one data directory.
///
/// ```text
/// <data_dir>/
///   saves/     local save records and index
///   cloud/     cloud store (unless overridden or local-only)
///   player/    account, stats, achievements, leaderboards
///   assets/    disk tier of the asset cache
/// ```
pub struct ServicesBuilder {
    config: PlaykitConfig,
    clock: Arc<dyn Clock>,
    storage: StorageConfig,
}

impl ServicesBuilder {
    pub fn new(config: PlaykitConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            storage: StorageConfig::default(),
        }
    }

    /// Provide a custom time source (e.g. a manual clock in tests).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the save key layout and slot limit.
    pub fn storage_config(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Build the context with every service registered but not yet initialized.
    pub fn build(self) -> Result<ServiceSetup> {
        let mode = self.config.storage_mode;

        let local = open_store(self.config.saves_dir())?;
        let cloud = match mode {
            StorageMode::LocalOnly => None,
            _ => Some(open_store(self.config.cloud_dir())?),
        };
        let storage_provider = create_storage_provider(
            mode,
            StorageBackends {
                local,
                cloud,
                clock: Arc::clone(&self.clock),
            },
            self.storage,
            self.config.hybrid.clone(),
        )
        .context("Failed to create storage provider")?;

        let player = open_store(self.config.player_dir())?;
        let clock = &self.clock;

        let context = ServiceContext::new();
        context.register(Arc::new(AccountService::with_provider(Arc::new(
            LocalAccountProvider::new(Arc::clone(&player)).with_clock(Arc::clone(clock)),
        ))?));
        context.register(Arc::new(DataStorageService::with_provider(storage_provider)?));
        context.register(Arc::new(StatsService::with_provider(Arc::new(
            LocalStatsProvider::new(Arc::clone(&player)).with_clock(Arc::clone(clock)),
        ))?));
        context.register(Arc::new(AchievementsService::with_provider(Arc::new(
            LocalAchievementsProvider::new(Arc::clone(&player)).with_clock(Arc::clone(clock)),
        ))?));
        context.register(Arc::new(LeaderboardsService::with_provider(Arc::new(
            LocalLeaderboardsProvider::new(player).with_clock(Arc::clone(clock)),
        ))?));

        tracing::info!(
            "Services assembled: storage={}, data_dir={}",
            mode,
            self.config.data_dir.display()
        );

        Ok(ServiceSetup {
            config: self.config,
            clock: self.clock,
            context: Arc::new(context),
        })
    }
}

pub struct ServiceSetup {
    pub config: PlaykitConfig,
    pub clock: Arc<dyn Clock>,
    pub context: Arc<ServiceContext>,
}

impl ServiceSetup {
    /// Asset cache configured from [`PlaykitConfig::asset_cache`], with its
    /// disk tier under `<data_dir>/assets`.
    pub fn asset_cache<D: AssetDecoder>(
        &self,
        decoder: D,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Result<AssetCache<D>> {
        let disk = open_store(self.config.asset_dir())?;
        Ok(AssetCache::from_config(
            decoder,
            fetcher,
            disk,
            Arc::clone(&self.clock),
            &self.config.asset_cache,
        ))
    }
}

fn open_store(dir: std::path::PathBuf) -> Result<Arc<dyn BlobStore>> {
    let store = FileBlobStore::new(&dir)
        .with_context(|| format!("Failed to open blob store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

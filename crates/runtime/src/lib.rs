//! Client-side persistence and sync runtime.
//!
//! This crate wires swappable providers (local disk, cloud, hybrid) into
//! lifecycle-managed services. Consumers build a [`ServiceContext`], register
//! the services they need, and interact with saves, stats, achievements,
//! leaderboards, and remote assets through them.
//!
//! Modules are organized by responsibility:
//! - [`api`] hosts the provider contract, [`ServiceHost`], and [`ServiceContext`]
//! - [`events`] carries provider events up through each host
//! - [`storage`] implements local and hybrid (offline-first) save providers
//! - [`cache`] provides the bounded two-tier remote asset cache
//! - [`account`], [`leaderboards`], [`stats`], and [`achievements`] implement the player services
//! - [`repository`] and [`utils`] provide the blob store and clock adapters
pub mod account;
pub mod achievements;
pub mod api;
pub mod cache;
pub mod events;
pub mod leaderboards;
pub mod repository;
pub mod stats;
pub mod storage;
pub mod utils;

mod workers;

pub use account::{Account, AccountProvider, AccountService, LocalAccountProvider};
pub use achievements::{
    Achievement, AchievementsProvider, AchievementsService, LocalAchievementsProvider,
    PlayerAchievements,
};
pub use api::{
    Result, Service, ServiceContext, ServiceError, ServiceHost, ServiceKind, ServiceProvider,
    ServiceState, ServiceType,
};
pub use cache::{
    AssetCache, AssetCacheConfig, AssetDecoder, AssetFetcher, CacheError, DiskCache, FetchComplete,
    FifoCache, RawBytes,
};
pub use events::{
    AccountEvent, AchievementEvent, EventSink, LeaderboardEvent, LifecycleEvent, StatsEvent,
    StorageEvent,
};
pub use leaderboards::{
    Leaderboard, LeaderboardDefinition, LeaderboardEntry, LeaderboardsConfig,
    LeaderboardsProvider, LeaderboardsService, LocalLeaderboardsProvider, ScoreSubmission,
    SortOrder, SubmitOutcome,
};
pub use repository::{BlobStore, FileBlobStore, InMemoryBlobStore, RepositoryError};
pub use stats::{LocalStatsProvider, PlayerStats, Stat, StatKind, StatsProvider, StatsService};
pub use storage::{
    DataStorageProvider, DataStorageService, HybridDataStorageProvider, HybridOptions,
    LocalSaveProvider, SaveMetadata, SaveRecord, StorageBackends, StorageConfig, StorageMode,
    SyncReport, create_storage_provider,
};
pub use utils::{Clock, ManualClock, SystemClock};

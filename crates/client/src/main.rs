//! Playkit client binary.
//!
//! Composition root that assembles the playkit services and runs a short
//! session against them.
//!
//! # Lifecycle
//!
//! 1. Load `.env` and [`PlaykitConfig`] from the environment
//! 2. Install logging
//! 3. Build the [`ServiceContext`](playkit_runtime::ServiceContext) and initialize every service
//! 4. Log in, then exercise saves, stats, achievements, and leaderboards
//! 5. Flush pending cloud replication and shut down in reverse order
//!
//! # Features
//!
//! - `http`: prefetch the URLs given on the command line into the asset cache
//!
//! # Examples
//!
//! ```bash
//! PLAYKIT_STORAGE_MODE=local cargo run -p playkit-client
//! cargo run -p playkit-client --features http -- https://example.com/banner.png
//! ```

use std::collections::BTreeMap;

use anyhow::Result;
use playkit_bootstrap::{PlaykitConfig, ServiceSetup, ServicesBuilder, logging};
use playkit_runtime::{
    Account, AccountService, Achievement, AchievementsService, DataStorageService, LeaderboardDefinition,
    LeaderboardsService, SaveRecord, ScoreSubmission, SortOrder, Stat, StatKind, StatsService,
};

const PLAYER_NAME: &str = "local-player";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. Load configuration from environment
    let config = PlaykitConfig::from_env();

    // 2. Setup logging
    let _log_guard = logging::setup_logging(&config)?;

    tracing::info!("Starting playkit client");
    tracing::info!("Session ID: {:?}", config.session_id);
    tracing::info!("Storage mode: {}", config.storage_mode);
    tracing::info!("Data directory: {}", config.data_dir.display());

    // 3. Build and initialize services
    let setup = ServicesBuilder::new(config).build()?;
    for (kind, error) in setup.context.initialize_all().await {
        tracing::warn!("Service {} unavailable: {}", kind, error);
    }

    // 4. Run session
    let session = run_session(&setup).await;

    #[cfg(feature = "http")]
    prefetch_assets(&setup).await?;

    // 5. Shutdown (flushes background replication)
    setup.context.shutdown_all().await;
    tracing::info!("Client shutdown complete");

    session
}

/// Log in as the device player, registering the account on first run.
async fn sign_in(setup: &ServiceSetup) -> Result<Account> {
    let account = setup.context.require::<AccountService>()?;
    if let Some(current) = account.current_account() {
        return Ok(current);
    }
    match account.login(PLAYER_NAME, "").await {
        Ok(player) => Ok(player),
        Err(e) if e.is_not_found() => Ok(account.create_account(PLAYER_NAME, "", "").await?),
        Err(e) => Err(e.into()),
    }
}

async fn run_session(setup: &ServiceSetup) -> Result<()> {
    let player = sign_in(setup).await?;
    tracing::info!("Playing as {} ({})", player.display_name, player.user_id);

    let storage = setup.context.require::<DataStorageService>()?;
    let mut record = match storage.load("autosave").await {
        Ok(record) => {
            tracing::info!(
                "Resuming '{}' (last saved {})",
                record.save_name,
                record.last_modified
            );
            record
        }
        Err(e) if e.is_not_found() => SaveRecord::new("Autosave"),
        Err(e) => return Err(e.into()),
    };
    let sessions = record.payload["sessions"].as_u64().unwrap_or(0) + 1;
    record.set_payload(&BTreeMap::from([("sessions", sessions)]))?;
    let saved = storage.save("autosave", record).await?;
    tracing::info!("Saved session {} at {}", sessions, saved.last_modified);

    let stats = setup.context.require::<StatsService>()?;
    stats
        .define_stats(vec![Stat::new("sessions_played", "Sessions Played", StatKind::Int)])
        .await?;
    let played = stats.increment_stat("sessions_played", 1.0).await?;

    let achievements = setup.context.require::<AchievementsService>()?;
    achievements
        .define_achievements(vec![
            Achievement::new("regular", "Regular", "Play 5 sessions").with_max_progress(5.0),
        ])
        .await?;
    achievements.set_progress("regular", played).await?;

    let leaderboards = setup.context.require::<LeaderboardsService>()?;
    leaderboards
        .define_leaderboards(vec![LeaderboardDefinition::new(
            "sessions",
            "Most Sessions",
            SortOrder::Descending,
        )])
        .await?;
    leaderboards
        .submit_score(
            "sessions",
            ScoreSubmission::new(&player.user_id, played as i64)
                .with_username(&player.display_name),
        )
        .await?;
    let rank = leaderboards.get_player_rank("sessions", &player.user_id).await?;

    tracing::info!(
        "Sessions played: {}, achievements: {:.0}%, rank: {}",
        played,
        achievements.completion_percentage().await?,
        rank
    );
    Ok(())
}

#[cfg(feature = "http")]
async fn prefetch_assets(setup: &ServiceSetup) -> Result<()> {
    use std::sync::Arc;

    use playkit_runtime::RawBytes;
    use playkit_runtime::cache::HttpFetcher;

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        return Ok(());
    }

    let cache = setup.asset_cache(RawBytes, Arc::new(HttpFetcher::new()))?;
    for url in urls {
        match cache.get(&url).await {
            Ok(bytes) => tracing::info!("Cached {} ({} bytes)", url, bytes.len()),
            Err(e) => tracing::warn!("Failed to cache {}: {}", url, e),
        }
    }
    Ok(())
}

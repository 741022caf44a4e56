use std::sync::Arc;

use playkit_runtime::{
    AccountEvent, AccountService, Achievement, AchievementEvent, AchievementsService,
    DataStorageService, InMemoryBlobStore, LeaderboardsService, LifecycleEvent,
    LocalAccountProvider, LocalAchievementsProvider, LocalLeaderboardsProvider,
    LocalSaveProvider, LocalStatsProvider, SaveRecord, ScoreSubmission, Service, ServiceContext,
    ServiceError, ServiceKind, ServiceProvider, ServiceState, Stat, StatKind, StatsService,
    StorageEvent,
};

fn context_with_all_services(store: &Arc<InMemoryBlobStore>) -> ServiceContext {
    let context = ServiceContext::new();
    context.register(Arc::new(
        AccountService::with_provider(Arc::new(LocalAccountProvider::new(store.clone())))
            .expect("provider binds"),
    ));
    context.register(Arc::new(
        DataStorageService::with_provider(Arc::new(LocalSaveProvider::new(store.clone())))
            .expect("provider binds"),
    ));
    context.register(Arc::new(
        StatsService::with_provider(Arc::new(LocalStatsProvider::new(store.clone())))
            .expect("provider binds"),
    ));
    context.register(Arc::new(
        AchievementsService::with_provider(Arc::new(LocalAchievementsProvider::new(
            store.clone(),
        )))
        .expect("provider binds"),
    ));
    context.register(Arc::new(
        LeaderboardsService::with_provider(Arc::new(LocalLeaderboardsProvider::new(
            store.clone(),
        )))
        .expect("provider binds"),
    ));
    context
}

/// Full session through a service context.
///
/// Phases:
/// 1. Register every service and initialize them together
/// 2. Use each service through the context
/// 3. Shut everything down and restart over the same store
#[tokio::test]
async fn test_context_session_round_trip() {
    let store = Arc::new(InMemoryBlobStore::new());

    println!("\n=== Phase 1: Initialize ===");
    let context = context_with_all_services(&store);
    assert_eq!(context.len(), 5);
    assert_eq!(
        context.kinds(),
        [
            ServiceKind::Account,
            ServiceKind::DataStorage,
            ServiceKind::Stats,
            ServiceKind::Achievements,
            ServiceKind::Leaderboards,
        ]
    );
    assert!(
        context.require::<StatsService>().is_err(),
        "registered but not yet initialized"
    );
    let failures = context.initialize_all().await;
    assert!(failures.is_empty(), "unexpected failures: {:?}", failures);

    println!("\n=== Phase 2: Play ===");
    let account = context.require::<AccountService>().expect("account ready");
    let player = account.create_account("p1", "hunter2", "p1@example.com").await.unwrap();
    let storage = context.require::<DataStorageService>().expect("storage ready");
    storage
        .save(
            "slot1",
            SaveRecord::new("Autosave")
                .with_payload(&serde_json::json!({ "gold": 120 }))
                .unwrap(),
        )
        .await
        .unwrap();

    let stats = context.require::<StatsService>().expect("stats ready");
    stats
        .define_stats(vec![Stat::new("kills", "Kills", StatKind::Int)])
        .await
        .unwrap();
    assert_eq!(stats.increment_stat("kills", 2.6).await.unwrap(), 3.0);

    let achievements = context.require::<AchievementsService>().expect("achievements ready");
    achievements.unlock("first_steps").await.unwrap();

    let leaderboards = context.require::<LeaderboardsService>().expect("leaderboards ready");
    leaderboards
        .submit_score("arena", ScoreSubmission::new(&player.user_id, 42))
        .await
        .unwrap();

    println!("\n=== Phase 3: Restart ===");
    context.shutdown_all().await;
    assert!(context.is_empty());
    assert_eq!(storage.state(), ServiceState::Uninitialized);
    assert!(storage.load("slot1").await.unwrap_err().is_not_initialized());

    let context = context_with_all_services(&store);
    assert!(context.initialize_all().await.is_empty());

    let account = context.require::<AccountService>().unwrap();
    assert_eq!(account.current_account(), Some(player.clone()));

    let storage = context.require::<DataStorageService>().unwrap();
    let record = storage.load("slot1").await.unwrap();
    assert_eq!(record.payload["gold"], 120);

    let stats = context.require::<StatsService>().unwrap();
    assert_eq!(stats.get_stat("kills").await.unwrap(), 3.0);

    let achievements = context.require::<AchievementsService>().unwrap();
    assert!(achievements.is_unlocked("first_steps").await.unwrap());

    let leaderboards = context.require::<LeaderboardsService>().unwrap();
    assert_eq!(
        leaderboards
            .get_player_score("arena", &player.user_id)
            .await
            .unwrap(),
        42
    );

    context.shutdown_all().await;
}

/// A provider can only be swapped while the service is uninitialized.
///
/// Phases:
/// 1. Bind provider A, initialize, attempt to bind B (rejected)
/// 2. Shutdown, bind B, initialize
/// 3. Events now come from B; lifecycle events mark every transition
#[tokio::test]
async fn test_provider_swap_requires_shutdown() {
    let store_a = Arc::new(InMemoryBlobStore::new());
    let store_b = Arc::new(InMemoryBlobStore::new());
    let provider_a = Arc::new(LocalSaveProvider::new(store_a.clone()).with_name("A"));
    let provider_b = Arc::new(LocalSaveProvider::new(store_b.clone()).with_name("B"));

    let service = DataStorageService::with_provider(provider_a.clone()).unwrap();
    let mut lifecycle = service.subscribe_lifecycle();
    let mut events = service.subscribe();

    println!("\n=== Phase 1: Bound to A ===");
    service.initialize().await.unwrap();
    let err = service.set_provider(provider_b.clone()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::ProviderBound {
            service: ServiceKind::DataStorage
        }
    ));
    assert_eq!(service.provider().unwrap().name(), "A");

    service.save("slot", SaveRecord::new("on A")).await.unwrap();
    assert!(!store_a.is_empty());
    assert!(store_b.is_empty());

    println!("\n=== Phase 2: Swap to B ===");
    service.shutdown().await;
    assert!(!provider_a.is_initialized());
    service.set_provider(provider_b.clone()).unwrap();
    service.initialize().await.unwrap();
    assert_eq!(service.provider().unwrap().name(), "B");
    assert!(
        service.load("slot").await.unwrap_err().is_not_found(),
        "B has its own store"
    );
    service.save("slot", SaveRecord::new("on B")).await.unwrap();
    assert!(!store_b.is_empty());

    println!("\n=== Phase 3: Events ===");
    let transitions: Vec<bool> = std::iter::from_fn(|| lifecycle.try_recv().ok())
        .map(|LifecycleEvent { kind, initialized }| {
            assert_eq!(kind, ServiceKind::DataStorage);
            initialized
        })
        .collect();
    assert_eq!(transitions, [true, false, true]);

    let saves: Vec<StorageEvent> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, StorageEvent::SaveComplete { .. }))
        .collect();
    assert_eq!(saves.len(), 2);

    service.shutdown().await;
    service.shutdown().await;
    assert_eq!(service.state(), ServiceState::Uninitialized);
}

/// Initialization without a provider fails and leaves the service unusable.
#[tokio::test]
async fn test_initialize_without_provider() {
    let context = ServiceContext::new();
    context.register(Arc::new(StatsService::new()));

    let failures = context.initialize_all().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, ServiceKind::Stats);
    assert!(matches!(failures[0].1, ServiceError::ProviderNotSet { .. }));

    let stats = context.get::<StatsService>().expect("registered");
    assert!(stats.get_stat("x").await.unwrap_err().is_not_initialized());
    assert!(context.require::<StatsService>().is_err());
    assert!(context.get::<AchievementsService>().is_none());
}

/// Stat kinds aggregate samples differently.
#[tokio::test]
async fn test_stat_kinds_through_service() {
    let service = StatsService::with_provider(Arc::new(LocalStatsProvider::new(Arc::new(
        InMemoryBlobStore::new(),
    ))))
    .unwrap();
    service.initialize().await.unwrap();
    service
        .define_stats(vec![
            Stat::new("avg_lap", "Average Lap", StatKind::Average),
            Stat::new("best_combo", "Best Combo", StatKind::Max),
            Stat::new("fastest", "Fastest", StatKind::Min),
            Stat::new("distance", "Distance", StatKind::Float),
        ])
        .await
        .unwrap();

    for lap in [30.0, 40.0, 50.0] {
        service.increment_stat("avg_lap", lap).await.unwrap();
        service.increment_stat("best_combo", lap).await.unwrap();
        service.increment_stat("fastest", lap).await.unwrap();
        service.increment_stat("distance", lap).await.unwrap();
    }

    assert_eq!(service.get_stat("avg_lap").await.unwrap(), 40.0);
    assert_eq!(service.get_stat("best_combo").await.unwrap(), 50.0);
    assert_eq!(service.get_stat("fastest").await.unwrap(), 30.0);
    assert_eq!(service.get_stat("distance").await.unwrap(), 120.0);

    service.reset_all_stats().await.unwrap();
    assert_eq!(service.get_stat("distance").await.unwrap(), 0.0);
}

/// Progressive achievements unlock exactly once at their maximum.
#[tokio::test]
async fn test_progressive_achievement_unlocks_once() {
    let service = AchievementsService::with_provider(Arc::new(LocalAchievementsProvider::new(
        Arc::new(InMemoryBlobStore::new()),
    )))
    .unwrap();
    let mut events = service.subscribe();
    service.initialize().await.unwrap();
    service
        .define_achievements(vec![
            Achievement::new("collector", "Collector", "Collect 10 gems").with_max_progress(10.0),
            Achievement::new("secret", "???", "Find the room").hidden(),
        ])
        .await
        .unwrap();

    service.increment_progress("collector", 4.0).await.unwrap();
    service.increment_progress("collector", 4.0).await.unwrap();
    service.increment_progress("collector", 4.0).await.unwrap();
    service.increment_progress("collector", 4.0).await.unwrap();

    let collector = service.get_achievement("collector").await.unwrap();
    assert!(collector.is_unlocked);
    assert_eq!(collector.progress, 10.0);
    assert_eq!(collector.progress_percentage(), 100.0);
    assert_eq!(service.completion_percentage().await.unwrap(), 50.0);

    let unlocks = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, AchievementEvent::Unlocked(_)))
        .count();
    assert_eq!(unlocks, 1);
}

/// Account sessions: guest play, then a registered login that survives a restart.
///
/// Phases:
/// 1. Calls before initialization fail and nobody is logged in
/// 2. Guest session, logout, unknown login rejected
/// 3. Registered account restored after shutdown and re-initialize
#[tokio::test]
async fn test_account_sessions() {
    let store = Arc::new(InMemoryBlobStore::new());
    let service =
        AccountService::with_provider(Arc::new(LocalAccountProvider::new(store.clone())))
            .unwrap();
    let mut events = service.subscribe();

    println!("\n=== Phase 1: Uninitialized ===");
    assert!(service.login_as_guest().await.unwrap_err().is_not_initialized());
    assert!(!service.is_logged_in());
    service.initialize().await.unwrap();

    println!("\n=== Phase 2: Guest ===");
    let guest = service.login_as_guest().await.unwrap();
    assert!(guest.is_guest);
    service.logout().await.unwrap();
    assert!(service.login("nobody", "pw").await.unwrap_err().is_not_found());

    let received: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0], AccountEvent::LoginSucceeded(Box::new(guest)));
    assert_eq!(received[1], AccountEvent::LoggedOut);
    assert!(matches!(received[2], AccountEvent::LoginFailed { .. }));

    println!("\n=== Phase 3: Restore ===");
    let ada = service.create_account("ada", "pw", "").await.unwrap();
    service.shutdown().await;
    assert!(service.current_account().is_none());

    service.initialize().await.unwrap();
    assert_eq!(service.current_account(), Some(ada));
    service.shutdown().await;
}

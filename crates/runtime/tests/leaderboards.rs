use std::sync::Arc;

use playkit_runtime::{
    InMemoryBlobStore, LeaderboardDefinition, LeaderboardEvent, LeaderboardsService,
    LocalLeaderboardsProvider, ScoreSubmission, Service, ServiceError, SortOrder, SubmitOutcome,
};

async fn service(store: Arc<InMemoryBlobStore>) -> LeaderboardsService {
    let service = LeaderboardsService::with_provider(Arc::new(LocalLeaderboardsProvider::new(store)))
        .expect("fresh service accepts a provider");
    service.initialize().await.expect("service should initialize");
    service
}

/// One entry per user, replaced only by a better score, ranked 1..N.
///
/// Phases:
/// 1. A scores 100, B scores 200, A improves to 150
/// 2. A submits 100 again, which is rejected
/// 3. Ranks and scores reflect only each user's best
#[tokio::test]
async fn test_highscores_keep_best_per_user() {
    let service = service(Arc::new(InMemoryBlobStore::new())).await;
    service
        .define_leaderboards(vec![LeaderboardDefinition::new(
            "highscores",
            "High Scores",
            SortOrder::Descending,
        )])
        .await
        .unwrap();

    let service = &service;
    let submit = move |user: &'static str, score: i64| {
        service.submit_score("highscores", ScoreSubmission::new(user, score).with_username(user))
    };

    assert_eq!(submit("A", 100).await.unwrap(), SubmitOutcome::Inserted);
    assert_eq!(submit("B", 200).await.unwrap(), SubmitOutcome::Inserted);
    assert_eq!(submit("A", 150).await.unwrap(), SubmitOutcome::Improved);
    assert_eq!(submit("A", 100).await.unwrap(), SubmitOutcome::Unchanged);

    let board = service.get_leaderboard("highscores", 10).await.unwrap();
    let rows: Vec<_> = board
        .entries()
        .iter()
        .map(|e| (e.user_id.as_str(), e.rank, e.score))
        .collect();
    assert_eq!(rows, [("B", 1, 200), ("A", 2, 150)]);

    assert_eq!(service.get_player_rank("highscores", "A").await.unwrap(), 2);
    assert_eq!(service.get_player_score("highscores", "A").await.unwrap(), 150);
}

/// Ascending boards treat lower scores as better.
#[tokio::test]
async fn test_ascending_board_prefers_lower_scores() {
    let service = service(Arc::new(InMemoryBlobStore::new())).await;
    service
        .define_leaderboards(vec![LeaderboardDefinition::new(
            "speedrun",
            "Fastest Run",
            SortOrder::Ascending,
        )])
        .await
        .unwrap();

    for (user, time) in [("ana", 95_000), ("bo", 88_500), ("ana", 87_000), ("bo", 90_000)] {
        service
            .submit_score("speedrun", ScoreSubmission::new(user, time))
            .await
            .unwrap();
    }

    let board = service.get_leaderboard("speedrun", 5).await.unwrap();
    assert_eq!(board.entries()[0].user_id, "ana");
    assert_eq!(board.entries()[0].score, 87_000);
    assert_eq!(service.get_player_score("speedrun", "bo").await.unwrap(), 88_500);
}

/// Ranks stay contiguous and ordered through a long run of submissions.
#[tokio::test]
async fn test_ranks_stay_contiguous() {
    let service = service(Arc::new(InMemoryBlobStore::new())).await;

    // Deterministic pseudo-random walk over 12 users.
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..300 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let user = format!("user{}", (seed >> 33) % 12);
        let score = ((seed >> 17) % 10_000) as i64;
        service
            .submit_score("arena", ScoreSubmission::new(user, score))
            .await
            .unwrap();

        let board = service.get_leaderboard("arena", usize::MAX).await.unwrap();
        let entries = board.entries();
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.rank as usize, i + 1);
        }
        for pair in entries.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        let mut users: Vec<_> = entries.iter().map(|e| e.user_id.as_str()).collect();
        users.sort_unstable();
        users.dedup();
        assert_eq!(users.len(), entries.len(), "one entry per user");
    }
}

/// Top-N snapshots truncate without renumbering.
#[tokio::test]
async fn test_snapshot_truncates() {
    let service = service(Arc::new(InMemoryBlobStore::new())).await;
    for (i, user) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
        service
            .submit_score("weekly", ScoreSubmission::new(user, (i as i64 + 1) * 10))
            .await
            .unwrap();
    }

    let top = service.get_leaderboard("weekly", 3).await.unwrap();
    assert_eq!(top.len(), 3);
    assert_eq!(
        top.entries().iter().map(|e| e.rank).collect::<Vec<_>>(),
        [1, 2, 3]
    );
    assert_eq!(top.entries()[0].user_id, "e");

    let full = service.get_leaderboard("weekly", 100).await.unwrap();
    assert_eq!(full.len(), 5);
}

/// Reset clears entries on every board and survives a restart.
#[tokio::test]
async fn test_reset_all_persists() {
    let store = Arc::new(InMemoryBlobStore::new());
    {
        let service = service(Arc::clone(&store)).await;
        service
            .submit_score("daily", ScoreSubmission::new("p1", 5))
            .await
            .unwrap();
        service
            .submit_score("weekly", ScoreSubmission::new("p1", 7))
            .await
            .unwrap();
        service.reset_all().await.unwrap();
        service.shutdown().await;
    }

    let service = service(store).await;
    for id in ["daily", "weekly"] {
        let board = service.get_leaderboard(id, 10).await.unwrap();
        assert!(board.is_empty(), "board {} should be empty", id);
    }
    assert_eq!(
        service
            .submit_score("daily", ScoreSubmission::new("p2", 1))
            .await
            .unwrap(),
        SubmitOutcome::Inserted
    );
    assert_eq!(service.get_player_rank("daily", "p2").await.unwrap(), 1);
}

/// Unknown boards read as empty; missing entries report NotFound; invalid ids are rejected.
#[tokio::test]
async fn test_lookup_errors() {
    let service = service(Arc::new(InMemoryBlobStore::new())).await;
    service
        .submit_score("arena", ScoreSubmission::new("p1", 10))
        .await
        .unwrap();

    let unknown = service.get_leaderboard("nope", 10).await.unwrap();
    assert!(unknown.is_empty());
    assert_eq!(unknown.sort_order, SortOrder::Descending);
    assert!(service.get_player_rank("nope", "p1").await.unwrap_err().is_not_found());
    assert!(matches!(
        service.get_leaderboard("", 10).await.unwrap_err(),
        ServiceError::InvalidArgument(_)
    ));
    assert!(service.get_player_rank("arena", "ghost").await.unwrap_err().is_not_found());
    assert!(service.get_player_score("arena", "ghost").await.unwrap_err().is_not_found());

    let err = service
        .submit_score("  ", ScoreSubmission::new("p1", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}

/// Submissions publish events; calls before initialization fail.
#[tokio::test]
async fn test_events_and_initialization_gate() {
    let service = LeaderboardsService::with_provider(Arc::new(LocalLeaderboardsProvider::new(
        Arc::new(InMemoryBlobStore::new()),
    )))
    .unwrap();
    let mut events = service.subscribe();

    let err = service
        .submit_score("arena", ScoreSubmission::new("p1", 10))
        .await
        .unwrap_err();
    assert!(err.is_not_initialized());

    service.initialize().await.unwrap();
    service
        .submit_score("arena", ScoreSubmission::new("p1", 10))
        .await
        .unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        LeaderboardEvent::ScoreSubmitted {
            leaderboard_id: "arena".to_string(),
            score: 10,
        }
    );
}

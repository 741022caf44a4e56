//! Leaderboard ranking engine, provider, and service.
//!
//! Each board keeps one entry per user and only ever replaces it with a
//! better score. Entries are re-sorted and re-ranked `1..=N` after every
//! mutation.

mod board;
mod engine;
mod provider;
mod service;

pub use board::{
    Leaderboard, LeaderboardDefinition, LeaderboardEntry, ScoreSubmission, SortOrder,
    SubmitOutcome,
};
pub use engine::LeaderboardEngine;
pub use provider::{LeaderboardsConfig, LeaderboardsProvider, LocalLeaderboardsProvider};
pub use service::LeaderboardsService;

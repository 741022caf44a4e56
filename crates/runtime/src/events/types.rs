//! Event types for each service kind.

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::achievements::Achievement;
use crate::api::ServiceKind;

/// Raised by a host on every `Uninitialized <-> Initialized` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: ServiceKind,
    pub initialized: bool,
}

/// Events published by account providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountEvent {
    LoginSucceeded(Box<Account>),
    LoginFailed { reason: String },
    LoggedOut,
}

/// Events published by data-storage providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorageEvent {
    SaveComplete { slot_id: String },
    LoadComplete { slot_id: String },

    /// Bulk push to the cloud finished.
    SyncComplete { synced: usize, failed: usize },

    /// Generic error channel; background replication failures only surface here.
    Error { message: String },
}

/// Events published by leaderboard providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeaderboardEvent {
    ScoreSubmitted { leaderboard_id: String, score: i64 },
    LeaderboardLoaded { leaderboard_id: String },
}

/// Events published by stats providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatsEvent {
    StatUpdated { stat_id: String, value: f64 },
    StatsSynced,
}

/// Events published by achievement providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AchievementEvent {
    Unlocked(Box<Achievement>),
    Progress { achievement_id: String, progress: f64 },
    Synced,
}

//! Achievements service.
//!
//! Progress is clamped to `[0, max_progress]`; reaching the maximum unlocks
//! the achievement, after which further progress updates are ignored.

mod provider;
mod service;
mod types;

pub use provider::{AchievementsProvider, LocalAchievementsProvider};
pub use service::AchievementsService;
pub use types::{Achievement, PlayerAchievements, ProgressUpdate};

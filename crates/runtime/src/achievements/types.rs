//! Achievements and their per-player state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub achievement_id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub icon_url: String,
    pub is_unlocked: bool,
    #[serde(default)]
    pub is_hidden: bool,
    pub progress: f64,
    pub max_progress: f64,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Result of a progress update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressUpdate {
    /// Already unlocked; nothing changed.
    Ignored,
    /// Progress moved but the achievement is still locked.
    Progressed(f64),
    /// Progress reached the maximum and unlocked the achievement.
    Unlocked,
}

impl Achievement {
    pub fn new(
        achievement_id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            achievement_id: achievement_id.into(),
            display_name: display_name.into(),
            description: description.into(),
            icon_url: String::new(),
            is_unlocked: false,
            is_hidden: false,
            progress: 0.0,
            max_progress: 1.0,
            unlocked_at: None,
        }
    }

    pub fn with_max_progress(mut self, max_progress: f64) -> Self {
        self.max_progress = max_progress;
        self
    }

    pub fn with_icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = icon_url.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    /// Locked copy of a definition.
    pub(crate) fn instantiate(&self) -> Self {
        let mut fresh = self.clone();
        fresh.reset();
        fresh
    }

    /// Progress as a percentage of `max_progress`.
    pub fn progress_percentage(&self) -> f64 {
        if self.max_progress <= 0.0 {
            return if self.is_unlocked { 100.0 } else { 0.0 };
        }
        self.progress / self.max_progress * 100.0
    }

    /// Whether the achievement tracks more than a single step.
    pub fn is_progressive(&self) -> bool {
        self.max_progress > 1.0
    }

    /// Unlock now. Returns `false` if it was already unlocked.
    pub fn unlock(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_unlocked {
            return false;
        }
        self.is_unlocked = true;
        self.progress = self.max_progress.max(0.0);
        self.unlocked_at = Some(now);
        true
    }

    /// Set progress, clamped to `[0, max_progress]`, unlocking at the maximum.
    pub fn set_progress(&mut self, progress: f64, now: DateTime<Utc>) -> ProgressUpdate {
        if self.is_unlocked {
            return ProgressUpdate::Ignored;
        }

        self.progress = progress.clamp(0.0, self.max_progress.max(0.0));
        if self.progress >= self.max_progress {
            self.unlock(now);
            ProgressUpdate::Unlocked
        } else {
            ProgressUpdate::Progressed(self.progress)
        }
    }

    pub fn reset(&mut self) {
        self.is_unlocked = false;
        self.progress = 0.0;
        self.unlocked_at = None;
    }
}

/// Every achievement tracked for the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerAchievements {
    pub achievements: BTreeMap<String, Achievement>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PlayerAchievements {
    pub fn get(&self, achievement_id: &str) -> Option<&Achievement> {
        self.achievements.get(achievement_id)
    }

    pub fn contains(&self, achievement_id: &str) -> bool {
        self.achievements.contains_key(achievement_id)
    }

    pub fn unlocked(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.values().filter(|a| a.is_unlocked)
    }

    /// Share of tracked achievements that are unlocked, in percent.
    pub fn completion_percentage(&self) -> f64 {
        if self.achievements.is_empty() {
            return 0.0;
        }
        self.unlocked().count() as f64 / self.achievements.len() as f64 * 100.0
    }

    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }
}

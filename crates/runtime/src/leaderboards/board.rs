//! Ranked score table.
//!
//! Invariants maintained after every mutation:
//! - at most one entry per user
//! - entries sorted by score per [`SortOrder`], equal scores by first submission
//! - ranks are exactly `1..=len`

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction in which scores improve.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum SortOrder {
    /// Lower is better (e.g. fastest time).
    Ascending,
    /// Higher is better.
    #[default]
    Descending,
}

impl SortOrder {
    /// Whether `candidate` beats `current`.
    pub fn is_better(self, candidate: i64, current: i64) -> bool {
        match self {
            SortOrder::Ascending => candidate < current,
            SortOrder::Descending => candidate > current,
        }
    }

    /// Ordering placing better scores first.
    pub fn compare(self, a: i64, b: i64) -> Ordering {
        match self {
            SortOrder::Ascending => a.cmp(&b),
            SortOrder::Descending => b.cmp(&a),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardDefinition {
    pub id: String,
    pub display_name: String,
    pub sort_order: SortOrder,
}

impl LeaderboardDefinition {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, sort_order: SortOrder) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            sort_order,
        }
    }
}

/// A score submitted on behalf of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub user_id: String,
    pub username: String,
    pub score: i64,
    pub extra_data: Option<String>,
}

impl ScoreSubmission {
    pub fn new(user_id: impl Into<String>, score: i64) -> Self {
        let user_id = user_id.into();
        Self {
            username: user_id.clone(),
            user_id,
            score,
            extra_data: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_extra_data(mut self, extra_data: impl Into<String>) -> Self {
        self.extra_data = Some(extra_data.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub score: i64,
    pub rank: u32,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub extra_data: Option<String>,
    /// First-submission sequence; breaks ties between equal scores.
    #[serde(default)]
    sequence: u64,
}

/// What a submission did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// First entry for the user.
    Inserted,
    /// Existing entry replaced by a better score.
    Improved,
    /// Score was not better; board unchanged.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub id: String,
    pub display_name: String,
    pub sort_order: SortOrder,
    entries: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    next_sequence: u64,
}

impl Leaderboard {
    pub fn new(definition: LeaderboardDefinition) -> Self {
        Self {
            id: definition.id,
            display_name: definition.display_name,
            sort_order: definition.sort_order,
            entries: Vec::new(),
            last_updated: None,
            next_sequence: 0,
        }
    }

    pub fn definition(&self) -> LeaderboardDefinition {
        LeaderboardDefinition::new(self.id.clone(), self.display_name.clone(), self.sort_order)
    }

    /// Apply a submission, keeping only each user's best score.
    pub fn submit(&mut self, submission: ScoreSubmission, now: DateTime<Utc>) -> SubmitOutcome {
        let outcome = match self.entries.iter_mut().find(|e| e.user_id == submission.user_id) {
            Some(entry) => {
                if !self.sort_order.is_better(submission.score, entry.score) {
                    return SubmitOutcome::Unchanged;
                }
                entry.score = submission.score;
                entry.username = submission.username;
                entry.submitted_at = now;
                entry.extra_data = submission.extra_data;
                SubmitOutcome::Improved
            }
            None => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                self.entries.push(LeaderboardEntry {
                    user_id: submission.user_id,
                    username: submission.username,
                    score: submission.score,
                    rank: 0,
                    submitted_at: now,
                    extra_data: submission.extra_data,
                    sequence,
                });
                SubmitOutcome::Inserted
            }
        };

        self.rerank();
        self.last_updated = Some(now);
        outcome
    }

    /// Entries in rank order.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Copy of the board holding only the top `max_entries` entries.
    pub fn snapshot(&self, max_entries: usize) -> Leaderboard {
        let mut snapshot = self.clone();
        snapshot.entries.truncate(max_entries);
        snapshot
    }

    pub fn entry(&self, user_id: &str) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| e.user_id == user_id)
    }

    pub fn rank_of(&self, user_id: &str) -> Option<u32> {
        self.entry(user_id).map(|e| e.rank)
    }

    pub fn score_of(&self, user_id: &str) -> Option<i64> {
        self.entry(user_id).map(|e| e.score)
    }

    /// Drop every entry, keeping the definition.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.entries.clear();
        self.next_sequence = 0;
        self.last_updated = Some(now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-establish ordering and ranks, e.g. after deserialization.
    pub(crate) fn normalize(&mut self) {
        self.next_sequence = self
            .entries
            .iter()
            .map(|e| e.sequence + 1)
            .max()
            .unwrap_or(0)
            .max(self.next_sequence);
        self.rerank();
    }

    fn rerank(&mut self) {
        let order = self.sort_order;
        self.entries.sort_by(|a, b| {
            order
                .compare(a.score, b.score)
                .then(a.sequence.cmp(&b.sequence))
        });
        for (position, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = position as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn board(order: SortOrder) -> Leaderboard {
        Leaderboard::new(LeaderboardDefinition::new("b", "Board", order))
    }

    fn assert_contiguous(board: &Leaderboard) {
        let ranks: Vec<u32> = board.entries().iter().map(|e| e.rank).collect();
        let expected: Vec<u32> = (1..=board.len() as u32).collect();
        assert_eq!(ranks, expected);
    }

    #[test]
    fn test_worse_score_is_ignored() {
        let mut board = board(SortOrder::Descending);
        assert_eq!(board.submit(ScoreSubmission::new("a", 150), now()), SubmitOutcome::Inserted);
        assert_eq!(board.submit(ScoreSubmission::new("a", 100), now()), SubmitOutcome::Unchanged);
        assert_eq!(board.submit(ScoreSubmission::new("a", 150), now()), SubmitOutcome::Unchanged);
        assert_eq!(board.score_of("a"), Some(150));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_ascending_prefers_lower() {
        let mut board = board(SortOrder::Ascending);
        board.submit(ScoreSubmission::new("a", 90), now());
        board.submit(ScoreSubmission::new("b", 60), now());
        assert_eq!(board.submit(ScoreSubmission::new("a", 50), now()), SubmitOutcome::Improved);
        assert_eq!(board.rank_of("a"), Some(1));
        assert_eq!(board.rank_of("b"), Some(2));
        assert_contiguous(&board);
    }

    #[test]
    fn test_ties_keep_first_submission_order() {
        let mut board = board(SortOrder::Descending);
        board.submit(ScoreSubmission::new("a", 100), now());
        board.submit(ScoreSubmission::new("b", 150), now());
        board.submit(ScoreSubmission::new("c", 150), now());
        board.submit(ScoreSubmission::new("a", 150), now());

        let order: Vec<&str> = board.entries().iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
        assert_contiguous(&board);
    }

    #[test]
    fn test_snapshot_truncates() {
        let mut board = board(SortOrder::Descending);
        for (i, user) in ["a", "b", "c", "d"].iter().enumerate() {
            board.submit(ScoreSubmission::new(*user, i as i64), now());
        }
        assert_eq!(board.snapshot(2).len(), 2);
        assert_eq!(board.snapshot(2).entries()[0].user_id, "d");
        assert_eq!(board.snapshot(10).len(), 4);
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn test_reset_keeps_definition() {
        let mut board = board(SortOrder::Ascending);
        board.submit(ScoreSubmission::new("a", 1), now());
        board.reset(now());
        assert!(board.is_empty());
        assert_eq!(board.sort_order, SortOrder::Ascending);
        assert_eq!(board.rank_of("a"), None);
    }

    #[test]
    fn test_submission_details_are_kept() {
        let mut board = board(SortOrder::Descending);
        board.submit(
            ScoreSubmission::new("u1", 10)
                .with_username("Ada")
                .with_extra_data("{\"stage\":3}"),
            now(),
        );
        let entry = board.entry("u1").unwrap();
        assert_eq!(entry.username, "Ada");
        assert_eq!(entry.extra_data.as_deref(), Some("{\"stage\":3}"));
        assert_eq!(board.last_updated, Some(now()));
    }
}

//! Collection of leaderboards keyed by id.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};

use super::{Leaderboard, LeaderboardDefinition, ScoreSubmission, SortOrder, SubmitOutcome};
use crate::api::{Result, ServiceError};

/// All boards known to a provider.
///
/// Submitting to an undefined id creates the board on the fly with the
/// default sort order. Reading an undefined id yields an empty board with the
/// default order without registering it.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardEngine {
    boards: BTreeMap<String, Leaderboard>,
    default_order: SortOrder,
}

impl LeaderboardEngine {
    pub fn new(default_order: SortOrder) -> Self {
        Self {
            boards: BTreeMap::new(),
            default_order,
        }
    }

    /// Create boards for definitions that do not exist yet.
    ///
    /// Existing boards keep their entries and settings. Returns the ids created.
    pub fn define(&mut self, definitions: impl IntoIterator<Item = LeaderboardDefinition>) -> Vec<String> {
        let mut created = Vec::new();
        for definition in definitions {
            if self.boards.contains_key(&definition.id) {
                continue;
            }
            created.push(definition.id.clone());
            self.boards
                .insert(definition.id.clone(), Leaderboard::new(definition));
        }
        created
    }

    /// Insert a fully formed board, e.g. one restored from storage.
    pub fn restore(&mut self, mut board: Leaderboard) {
        board.normalize();
        self.boards.insert(board.id.clone(), board);
    }

    /// Apply a submission in place.
    pub fn submit(
        &mut self,
        leaderboard_id: &str,
        submission: ScoreSubmission,
        now: DateTime<Utc>,
    ) -> Result<(SubmitOutcome, &Leaderboard)> {
        let mut board = self.stage(leaderboard_id, &submission)?;
        let outcome = board.submit(submission, now);
        Ok((outcome, self.commit(board)))
    }

    /// Copy of the board `submission` targets, leaving the engine untouched.
    ///
    /// Unknown ids yield a new empty board with the default sort order.
    pub fn stage(&self, leaderboard_id: &str, submission: &ScoreSubmission) -> Result<Leaderboard> {
        validate_id(leaderboard_id)?;
        if submission.user_id.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "user id must not be empty".to_string(),
            ));
        }

        Ok(match self.boards.get(leaderboard_id) {
            Some(board) => board.clone(),
            None => {
                tracing::debug!("Creating leaderboard {} on first submission", leaderboard_id);
                self.empty_board(leaderboard_id)
            }
        })
    }

    /// Insert or replace a board.
    pub fn commit(&mut self, board: Leaderboard) -> &Leaderboard {
        match self.boards.entry(board.id.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(board);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(board),
        }
    }

    /// Registered board, `NotFound` if the id was never defined or submitted to.
    pub fn get(&self, leaderboard_id: &str) -> Result<&Leaderboard> {
        self.boards
            .get(leaderboard_id)
            .ok_or_else(|| ServiceError::NotFound(format!("leaderboard '{}'", leaderboard_id)))
    }

    pub fn contains(&self, leaderboard_id: &str) -> bool {
        self.boards.contains_key(leaderboard_id)
    }

    /// Snapshot of the top `max_entries` entries; empty for unknown ids.
    pub fn top(&self, leaderboard_id: &str, max_entries: usize) -> Result<Leaderboard> {
        validate_id(leaderboard_id)?;
        Ok(match self.boards.get(leaderboard_id) {
            Some(board) => board.snapshot(max_entries),
            None => self.empty_board(leaderboard_id),
        })
    }

    pub fn rank_of(&self, leaderboard_id: &str, user_id: &str) -> Result<u32> {
        validate_id(leaderboard_id)?;
        self.boards
            .get(leaderboard_id)
            .and_then(|board| board.rank_of(user_id))
            .ok_or_else(|| no_entry(leaderboard_id, user_id))
    }

    pub fn score_of(&self, leaderboard_id: &str, user_id: &str) -> Result<i64> {
        validate_id(leaderboard_id)?;
        self.boards
            .get(leaderboard_id)
            .and_then(|board| board.score_of(user_id))
            .ok_or_else(|| no_entry(leaderboard_id, user_id))
    }

    /// Clear entries of every board, keeping definitions.
    pub fn reset_all(&mut self, now: DateTime<Utc>) {
        for board in self.boards.values_mut() {
            board.reset(now);
        }
    }

    pub fn boards(&self) -> impl Iterator<Item = &Leaderboard> {
        self.boards.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.boards.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn clear(&mut self) {
        self.boards.clear();
    }

    fn empty_board(&self, leaderboard_id: &str) -> Leaderboard {
        Leaderboard::new(LeaderboardDefinition::new(
            leaderboard_id,
            leaderboard_id,
            self.default_order,
        ))
    }
}

fn validate_id(leaderboard_id: &str) -> Result<()> {
    if leaderboard_id.trim().is_empty() {
        return Err(ServiceError::InvalidArgument(
            "leaderboard id must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn no_entry(leaderboard_id: &str, user_id: &str) -> ServiceError {
    ServiceError::NotFound(format!(
        "no entry for user '{}' on leaderboard '{}'",
        user_id, leaderboard_id
    ))
}

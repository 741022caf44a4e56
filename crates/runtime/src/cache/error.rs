//! Error types for the asset cache.

use thiserror::Error;

use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Asset cache failure.
///
/// Cloneable so a single fetch outcome can be handed to every coalesced
/// waiter and to completion subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("invalid asset url: {0:?}")]
    InvalidUrl(String),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("cache storage error: {0}")]
    Storage(String),
}

impl CacheError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        CacheError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<RepositoryError> for CacheError {
    fn from(err: RepositoryError) -> Self {
        CacheError::Storage(err.to_string())
    }
}

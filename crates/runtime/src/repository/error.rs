//! Error types raised by blob store implementations.

use thiserror::Error;

/// Errors surfaced by blob store implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("blob store lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid blob key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

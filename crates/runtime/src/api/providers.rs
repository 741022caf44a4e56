//! Asynchronous provider contract shared by every service kind.
//!
//! A provider implements the actual platform integration (local disk, a cloud
//! backend, or a hybrid of both). Service-specific traits such as
//! [`DataStorageProvider`](crate::storage::DataStorageProvider) extend
//! [`ServiceProvider`] with their operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::Result;
use crate::events::EventSink;

/// Service kinds known to the runtime; the [`ServiceContext`](super::ServiceContext)
/// holds at most one service per kind.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceKind {
    Account,
    DataStorage,
    Stats,
    Achievements,
    Leaderboards,
}

/// Lifecycle contract implemented by every provider.
///
/// `E` is the event type the provider publishes upward (e.g.
/// [`StorageEvent`](crate::events::StorageEvent)).
#[async_trait]
pub trait ServiceProvider<E: Send + 'static>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Initialize the provider.
    ///
    /// `events` is the channel into the owning host; it goes silent once the
    /// host shuts down or rebinds, so providers may keep it as long as they like.
    async fn initialize(&self, events: EventSink<E>) -> Result<()>;

    /// Release resources. Must be safe to call on an uninitialized provider.
    async fn shutdown(&self);

    fn is_initialized(&self) -> bool;
}

//! Event payloads and the per-host event channels that carry them.
//!
//! Each [`ServiceHost`](crate::api::ServiceHost) owns one broadcast channel.
//! Providers publish through an [`EventSink`] handed to them at initialization;
//! the sink is tied to the host's current generation so a provider that has
//! been shut down or replaced can no longer publish.

mod sink;
mod types;

pub use sink::EventSink;
pub use types::{
    AccountEvent, AchievementEvent, LeaderboardEvent, LifecycleEvent, StatsEvent, StorageEvent,
};

//! Player statistics service.

mod provider;
mod service;
mod types;

pub use provider::{LocalStatsProvider, StatsProvider};
pub use service::StatsService;
pub use types::{PlayerStats, Stat, StatKind};

//! Shared bootstrap utilities for playkit clients.
//!
//! Provides configuration loading, logging setup, and service assembly that
//! can be reused by the CLI binary, game front-ends, or tests.
pub mod builder;
pub mod config;
pub mod dirs;
pub mod logging;

pub use builder::{ServiceSetup, ServicesBuilder};
pub use config::PlaykitConfig;

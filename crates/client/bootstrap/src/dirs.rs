//! Platform-specific directory defaults.
//!
//! Follows platform conventions via `directories`:
//! - macOS: `~/Library/Application Support/playkit`
//! - Linux: `~/.local/share/playkit` (or `$XDG_DATA_HOME/playkit`)
//! - Windows: `%APPDATA%\playkit`
use std::path::PathBuf;

const APPLICATION: &str = "playkit";

/// Default root for saves, player data, and cached assets.
///
/// Falls back to `./playkit_data` when no home directory can be resolved.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APPLICATION)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./playkit_data"))
}


//! Client configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use playkit_runtime::{AssetCacheConfig, HybridOptions, StorageMode};

use crate::dirs;

/// Configuration required to assemble the playkit services.
#[derive(Clone, Debug)]
pub struct PlaykitConfig {
    /// Root for saves, player data, and cached assets.
    pub data_dir: PathBuf,
    pub storage_mode: StorageMode,
    pub hybrid: HybridOptions,
    /// Directory backing the cloud store. Defaults to `<data_dir>/cloud`.
    pub cloud_dir: Option<PathBuf>,
    pub asset_cache: AssetCacheConfig,
    pub session_id: Option<String>,
    /// Log file destination. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for PlaykitConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir(),
            storage_mode: StorageMode::default(),
            hybrid: HybridOptions::default(),
            cloud_dir: None,
            asset_cache: AssetCacheConfig::default(),
            session_id: None,
            log_dir: None,
        }
    }
}

impl PlaykitConfig {
    /// Configuration rooted at `data_dir` with every other setting at its default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `PLAYKIT_DATA_DIR` - Root data directory (default: platform-specific)
    /// - `PLAYKIT_STORAGE_MODE` - `local`, `hybrid`, or `cloud` (default: hybrid)
    /// - `PLAYKIT_CLOUD_SYNC` - Replicate saves in the background (default: true)
    /// - `PLAYKIT_CLOUD_DIR` - Directory backing the cloud store (default: `<data>/cloud`)
    /// - `PLAYKIT_ASSET_MEMORY_CAPACITY` - Decoded assets kept in memory (default: 50)
    /// - `PLAYKIT_ASSET_DISK_CACHE` - Enable the disk tier (default: true)
    /// - `PLAYKIT_ASSET_TTL_DAYS` - Disk entry lifetime in days (default: 7)
    /// - `PLAYKIT_ASSET_COALESCE` - Share concurrent fetches (default: true)
    /// - `PLAYKIT_SESSION_ID` - Session identifier for log files (optional)
    /// - `PLAYKIT_LOG_DIR` - Log file directory (optional)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = read("PLAYKIT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(mode) = read("PLAYKIT_STORAGE_MODE").map(|mode| mode.trim().to_lowercase()) {
            match mode.parse::<StorageMode>() {
                Ok(mode) => config.storage_mode = mode,
                Err(_) => tracing::warn!(
                    "Unknown PLAYKIT_STORAGE_MODE '{}', using {}",
                    mode,
                    config.storage_mode
                ),
            }
        }

        if let Some(enable) = parse(read("PLAYKIT_CLOUD_SYNC")) {
            config.hybrid.auto_sync = enable;
        }

        config.cloud_dir = read("PLAYKIT_CLOUD_DIR").map(PathBuf::from);

        // Asset cache
        if let Some(capacity) = parse::<usize>(read("PLAYKIT_ASSET_MEMORY_CAPACITY")) {
            config.asset_cache.memory_capacity = capacity;
        }
        if let Some(enable) = parse(read("PLAYKIT_ASSET_DISK_CACHE")) {
            config.asset_cache.enable_disk_cache = enable;
        }
        if let Some(days) = parse::<i64>(read("PLAYKIT_ASSET_TTL_DAYS")) {
            config.asset_cache.ttl = chrono::Duration::days(days.max(0));
        }
        if let Some(enable) = parse(read("PLAYKIT_ASSET_COALESCE")) {
            config.asset_cache.coalesce = enable;
        }

        config.session_id = read("PLAYKIT_SESSION_ID");
        config.log_dir = read("PLAYKIT_LOG_DIR").map(PathBuf::from);

        config
    }

    /// Directory backing the cloud store.
    pub fn cloud_dir(&self) -> PathBuf {
        self.cloud_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("cloud"))
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.data_dir.join("saves")
    }

    /// Directory shared by stats, achievements, and leaderboards.
    pub fn player_dir(&self) -> PathBuf {
        self.data_dir.join("player")
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.data_dir.join("assets")
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> PlaykitConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PlaykitConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("PLAYKIT_DATA_DIR", "/tmp/pk")]);
        assert_eq!(config.storage_mode, StorageMode::LocalWithCloudSync);
        assert!(config.hybrid.auto_sync);
        assert_eq!(config.cloud_dir(), PathBuf::from("/tmp/pk/cloud"));
        assert_eq!(config.asset_cache.memory_capacity, 50);
        assert_eq!(config.asset_cache.ttl, chrono::Duration::days(7));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PLAYKIT_DATA_DIR", "/data"),
            ("PLAYKIT_STORAGE_MODE", "Local"),
            ("PLAYKIT_CLOUD_SYNC", "false"),
            ("PLAYKIT_CLOUD_DIR", "/mnt/cloud"),
            ("PLAYKIT_ASSET_MEMORY_CAPACITY", "8"),
            ("PLAYKIT_ASSET_DISK_CACHE", "false"),
            ("PLAYKIT_ASSET_TTL_DAYS", "2"),
            ("PLAYKIT_ASSET_COALESCE", "false"),
            ("PLAYKIT_SESSION_ID", "run-1"),
        ]);
        assert_eq!(config.storage_mode, StorageMode::LocalOnly);
        assert!(!config.hybrid.auto_sync);
        assert_eq!(config.cloud_dir(), PathBuf::from("/mnt/cloud"));
        assert_eq!(config.asset_cache.memory_capacity, 8);
        assert!(!config.asset_cache.enable_disk_cache);
        assert_eq!(config.asset_cache.ttl, chrono::Duration::days(2));
        assert!(!config.asset_cache.coalesce);
        assert_eq!(config.session_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[
            ("PLAYKIT_DATA_DIR", "/data"),
            ("PLAYKIT_STORAGE_MODE", "floppy"),
            ("PLAYKIT_ASSET_MEMORY_CAPACITY", "lots"),
            ("PLAYKIT_SESSION_ID", "  "),
        ]);
        assert_eq!(config.storage_mode, StorageMode::LocalWithCloudSync);
        assert_eq!(config.asset_cache.memory_capacity, 50);
        assert!(config.session_id.is_none());
    }
}

//! Provider selection by storage mode.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    DataStorageProvider, HybridDataStorageProvider, HybridOptions, LocalSaveProvider,
    StorageConfig,
};
use crate::api::{Result, ServiceError, ServiceProvider};
use crate::repository::BlobStore;
use crate::utils::Clock;

/// Where saves live.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum StorageMode {
    /// Device storage only.
    #[strum(to_string = "local")]
    LocalOnly,

    /// Device storage with background cloud replication.
    #[default]
    #[strum(to_string = "hybrid")]
    LocalWithCloudSync,

    /// Cloud storage only.
    #[strum(to_string = "cloud")]
    CloudOnly,
}

/// Blob stores available to the factory.
pub struct StorageBackends {
    pub local: Arc<dyn BlobStore>,
    /// Backing store of the cloud side; required by every mode but `LocalOnly`.
    pub cloud: Option<Arc<dyn BlobStore>>,
    pub clock: Arc<dyn Clock>,
}

/// Build the provider for `mode`.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidArgument`] when the mode needs a cloud
/// store and none was supplied.
pub fn create_storage_provider(
    mode: StorageMode,
    backends: StorageBackends,
    config: StorageConfig,
    options: HybridOptions,
) -> Result<Arc<dyn DataStorageProvider>> {
    let cloud_store = || {
        backends.cloud.clone().ok_or_else(|| {
            ServiceError::InvalidArgument(format!("storage mode '{}' requires a cloud store", mode))
        })
    };

    let provider: Arc<dyn DataStorageProvider> = match mode {
        StorageMode::LocalOnly => Arc::new(
            LocalSaveProvider::new(Arc::clone(&backends.local))
                .with_clock(Arc::clone(&backends.clock))
                .with_config(config),
        ),
        StorageMode::CloudOnly => Arc::new(
            LocalSaveProvider::new(cloud_store()?)
                .with_name("cloud")
                .with_clock(Arc::clone(&backends.clock))
                .with_config(config),
        ),
        StorageMode::LocalWithCloudSync => {
            let local = LocalSaveProvider::new(Arc::clone(&backends.local))
                .with_clock(Arc::clone(&backends.clock))
                .with_config(config.clone());
            let remote = LocalSaveProvider::mirror(cloud_store()?).with_config(StorageConfig {
                max_save_slots: None,
                ..config
            });
            Arc::new(HybridDataStorageProvider::with_options(
                Arc::new(local),
                Arc::new(remote),
                options,
            ))
        }
    };

    tracing::debug!("Created {} storage provider: {}", mode, provider.name());
    Ok(provider)
}

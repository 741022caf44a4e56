//! Save-game storage: records, providers, and the data-storage service.
//!
//! - [`LocalSaveProvider`] writes records into a [`BlobStore`](crate::repository::BlobStore)
//!   and keeps a [`SaveIndex`] of known slots
//! - [`HybridDataStorageProvider`] writes locally first, replicates to a
//!   remote provider in the background, and picks the newer copy on load
//! - [`DataStorageService`] is the lifecycle-managed façade over either

mod factory;
mod hybrid;
mod local;
mod provider;
mod service;
mod types;

pub use factory::{StorageBackends, StorageMode, create_storage_provider};
pub use hybrid::{HybridDataStorageProvider, HybridOptions};
pub use local::LocalSaveProvider;
pub use provider::DataStorageProvider;
pub use service::DataStorageService;
pub use types::{SaveIndex, SaveMetadata, SaveRecord, StorageConfig, SyncReport};

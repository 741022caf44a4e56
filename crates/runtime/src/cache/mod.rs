//! Bounded remote asset cache.
//!
//! - [`FifoCache`] bounds decoded assets in memory, evicting by insertion order
//! - [`DiskCache`] keeps fetched bytes under `hash(url)` for at most a TTL
//! - [`AssetCache`] chains both in front of an [`AssetFetcher`]

mod disk;
mod error;
mod fetcher;
mod fifo;
mod loader;

pub use disk::DiskCache;
pub use error::{CacheError, Result};
#[cfg(feature = "http")]
pub use fetcher::HttpFetcher;
pub use fetcher::AssetFetcher;
pub use fifo::FifoCache;
pub use loader::{AssetCache, AssetCacheConfig, AssetDecoder, FetchComplete, RawBytes};

//! Two-tier remote asset cache.
//!
//! ```text
//! get(url)
//!   ├─► memory (FIFO, bounded)            hit → return
//!   ├─► disk (hash(url), TTL)             hit → decode, promote to memory
//!   └─► network (single flight per url)   ok  → disk + memory
//!                                         err → returned, never cached
//! ```
//!
//! Every resolved `get` is also published as a [`FetchComplete`] on the
//! completion channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Duration;
use tokio::sync::broadcast;

use super::{AssetFetcher, CacheError, DiskCache, FifoCache, Result};
use crate::repository::BlobStore;
use crate::utils::Clock;

const COMPLETION_CHANNEL_CAPACITY: usize = 64;

/// Turns fetched bytes into the asset type handed to callers.
pub trait AssetDecoder: Send + Sync + 'static {
    type Asset: Clone + Send + Sync + 'static;

    fn decode(&self, bytes: &[u8]) -> std::result::Result<Self::Asset, String>;
}

/// Decoder returning the fetched bytes unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawBytes;

impl AssetDecoder for RawBytes {
    type Asset = Arc<[u8]>;

    fn decode(&self, bytes: &[u8]) -> std::result::Result<Self::Asset, String> {
        Ok(Arc::from(bytes))
    }
}

/// Asset cache tunables.
#[derive(Debug, Clone)]
pub struct AssetCacheConfig {
    /// Maximum number of decoded assets held in memory.
    pub memory_capacity: usize,

    /// Persist fetched bytes to the disk tier.
    pub enable_disk_cache: bool,

    /// Maximum age of a disk entry.
    pub ttl: Duration,

    /// Share one network fetch between concurrent requests for the same url.
    pub coalesce: bool,
}

impl Default for AssetCacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: 50,
            enable_disk_cache: true,
            ttl: Duration::days(7),
            coalesce: true,
        }
    }
}

/// Outcome of one `get`, published to completion subscribers.
#[derive(Debug, Clone)]
pub struct FetchComplete<A> {
    pub url: String,
    pub result: std::result::Result<A, CacheError>,
}

type Flight<A> = broadcast::Sender<Result<A>>;

enum Role<A> {
    Leader(Flight<A>),
    Follower(broadcast::Receiver<Result<A>>),
}

/// Removes the in-flight entry when the leading request finishes or is dropped.
struct FlightGuard<'a, A> {
    in_flight: &'a Mutex<HashMap<String, Flight<A>>>,
    url: &'a str,
}

impl<A> Drop for FlightGuard<'_, A> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.url);
    }
}

/// Bounded memory + TTL disk cache in front of an [`AssetFetcher`].
pub struct AssetCache<D: AssetDecoder> {
    decoder: D,
    fetcher: Arc<dyn AssetFetcher>,
    disk: Option<DiskCache>,
    memory: Mutex<FifoCache<D::Asset>>,
    in_flight: Mutex<HashMap<String, Flight<D::Asset>>>,
    completions: broadcast::Sender<FetchComplete<D::Asset>>,
    coalesce: bool,
}

impl<D: AssetDecoder> AssetCache<D> {
    /// Memory-only cache. Use [`with_disk`](Self::with_disk) to add the disk tier.
    pub fn new(decoder: D, fetcher: Arc<dyn AssetFetcher>, config: &AssetCacheConfig) -> Self {
        Self {
            decoder,
            fetcher,
            disk: None,
            memory: Mutex::new(FifoCache::new(config.memory_capacity)),
            in_flight: Mutex::new(HashMap::new()),
            completions: broadcast::channel(COMPLETION_CHANNEL_CAPACITY).0,
            coalesce: config.coalesce,
        }
    }

    /// Build a cache from `config`, attaching the disk tier when enabled.
    pub fn from_config(
        decoder: D,
        fetcher: Arc<dyn AssetFetcher>,
        disk_store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        config: &AssetCacheConfig,
    ) -> Self {
        let cache = Self::new(decoder, fetcher, config);
        if config.enable_disk_cache {
            cache.with_disk(DiskCache::new(disk_store, clock, config.ttl))
        } else {
            cache
        }
    }

    /// Attach a disk tier, sweeping its expired entries first.
    pub fn with_disk(mut self, disk: DiskCache) -> Self {
        if let Err(e) = disk.sweep_expired() {
            tracing::warn!("Disk cache startup sweep failed: {}", e);
        }
        self.disk = Some(disk);
        self
    }

    /// Resolve `url` from memory, disk, or the network.
    pub async fn get(&self, url: &str) -> Result<D::Asset> {
        let result = self.resolve(url).await;
        if let Err(e) = &result {
            tracing::warn!("Asset {} unavailable: {}", url, e);
        }

        // Nobody listening is fine.
        let _ = self.completions.send(FetchComplete {
            url: url.to_string(),
            result: result.clone(),
        });
        result
    }

    /// Subscribe to completion notifications of every `get`.
    pub fn subscribe(&self) -> broadcast::Receiver<FetchComplete<D::Asset>> {
        self.completions.subscribe()
    }

    pub fn contains_in_memory(&self, url: &str) -> bool {
        self.lock_memory().contains(url)
    }

    pub fn memory_len(&self) -> usize {
        self.lock_memory().len()
    }

    pub fn clear_memory(&self) {
        self.lock_memory().clear();
    }

    /// Delete every disk entry. Returns how many were removed.
    pub fn clear_disk(&self) -> Result<usize> {
        match &self.disk {
            Some(disk) => disk.clear(),
            None => Ok(0),
        }
    }

    /// Delete expired disk entries. Returns how many were removed.
    pub fn sweep_expired(&self) -> Result<usize> {
        match &self.disk {
            Some(disk) => disk.sweep_expired(),
            None => Ok(0),
        }
    }

    /// Network fetches currently in progress (coalescing only).
    pub fn in_flight_count(&self) -> usize {
        self.lock_in_flight().len()
    }

    async fn resolve(&self, url: &str) -> Result<D::Asset> {
        if url.trim().is_empty() {
            return Err(CacheError::InvalidUrl(url.to_string()));
        }

        if let Some(asset) = self.from_memory(url) {
            return Ok(asset);
        }
        if let Some(asset) = self.from_disk(url) {
            return Ok(asset);
        }

        if !self.coalesce {
            return self.fetch_and_store(url).await;
        }

        match self.join_flight(url) {
            Role::Leader(flight) => {
                let guard = FlightGuard {
                    in_flight: &self.in_flight,
                    url,
                };
                // A previous flight may have landed between the lookups above
                // and taking the lead.
                let result = match self.from_memory(url) {
                    Some(asset) => Ok(asset),
                    None => self.fetch_and_store(url).await,
                };
                drop(guard);
                let _ = flight.send(result.clone());
                result
            }
            Role::Follower(mut rx) => match rx.recv().await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!("Leading fetch for {} was dropped, fetching directly", url);
                    self.fetch_and_store(url).await
                }
            },
        }
    }

    fn join_flight(&self, url: &str) -> Role<D::Asset> {
        let mut in_flight = self.lock_in_flight();
        match in_flight.get(url) {
            Some(flight) => Role::Follower(flight.subscribe()),
            None => {
                let (flight, _) = broadcast::channel(1);
                in_flight.insert(url.to_string(), flight.clone());
                Role::Leader(flight)
            }
        }
    }

    fn from_memory(&self, url: &str) -> Option<D::Asset> {
        self.lock_memory().get(url).cloned()
    }

    fn from_disk(&self, url: &str) -> Option<D::Asset> {
        let disk = self.disk.as_ref()?;
        let bytes = match disk.get(url) {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!("Disk cache read for {} failed: {}", url, e);
                return None;
            }
        };

        match self.decoder.decode(&bytes) {
            Ok(asset) => {
                tracing::debug!("Disk cache hit for {}", url);
                self.promote(url, asset.clone());
                Some(asset)
            }
            Err(reason) => {
                tracing::warn!("Discarding undecodable disk entry for {}: {}", url, reason);
                if let Err(e) = disk.remove(url) {
                    tracing::warn!("Failed to remove disk entry for {}: {}", url, e);
                }
                None
            }
        }
    }

    async fn fetch_and_store(&self, url: &str) -> Result<D::Asset> {
        tracing::debug!("Fetching {}", url);
        let bytes = self.fetcher.fetch(url).await?;

        let asset = self.decoder.decode(&bytes).map_err(|reason| CacheError::Decode {
            url: url.to_string(),
            reason,
        })?;

        if let Some(disk) = &self.disk
            && let Err(e) = disk.put(url, &bytes)
        {
            tracing::warn!("Failed to persist {} to disk cache: {}", url, e);
        }
        self.promote(url, asset.clone());
        Ok(asset)
    }

    fn promote(&self, url: &str, asset: D::Asset) {
        if let Some(evicted) = self.lock_memory().insert(url, asset) {
            tracing::trace!("Evicted {} from memory cache", evicted);
        }
    }

    fn lock_memory(&self) -> MutexGuard<'_, FifoCache<D::Asset>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, Flight<D::Asset>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl AssetFetcher for Echo {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Ok(url.as_bytes().to_vec())
        }
    }

    struct Utf8;

    impl AssetDecoder for Utf8 {
        type Asset = String;

        fn decode(&self, bytes: &[u8]) -> std::result::Result<String, String> {
            String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
        }
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected_and_reported() {
        let cache = AssetCache::new(RawBytes, Arc::new(Echo), &AssetCacheConfig::default());
        let mut completions = cache.subscribe();

        let err = cache.get("  ").await.unwrap_err();
        assert_eq!(err, CacheError::InvalidUrl("  ".to_string()));

        let complete = completions.recv().await.unwrap();
        assert_eq!(complete.url, "  ");
        assert!(complete.result.is_err());
    }

    #[tokio::test]
    async fn test_custom_decoder() {
        let cache = AssetCache::new(Utf8, Arc::new(Echo), &AssetCacheConfig::default());
        assert_eq!(cache.get("hello").await.unwrap(), "hello");
        assert!(cache.contains_in_memory("hello"));
        assert_eq!(cache.in_flight_count(), 0);
    }
}

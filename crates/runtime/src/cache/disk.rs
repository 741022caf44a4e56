//! TTL-bounded persistent asset cache.
//!
//! Entries are stored under `hash(url)` as a bincode envelope holding the
//! write time and the raw fetched bytes. An entry older than the TTL is
//! deleted instead of served, both on access and by [`DiskCache::sweep_expired`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Result;
use crate::repository::BlobStore;
use crate::utils::{Clock, hash_url};

#[derive(Debug, Serialize, Deserialize)]
struct DiskEnvelope {
    written_at_ms: i64,
    bytes: Vec<u8>,
}

pub struct DiskCache {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl DiskCache {
    pub fn new(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Bytes cached for `url`, or `None` if absent or expired.
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let key = hash_url(url);
        let Some(raw) = self.store.load(&key)? else {
            return Ok(None);
        };

        let envelope = match bincode::deserialize::<DiskEnvelope>(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Discarding corrupt disk cache entry for {}: {}", url, e);
                self.store.delete(&key)?;
                return Ok(None);
            }
        };

        if self.is_expired(envelope.written_at_ms) {
            tracing::debug!("Disk cache entry for {} expired", url);
            self.store.delete(&key)?;
            return Ok(None);
        }

        Ok(Some(envelope.bytes))
    }

    /// Store `bytes` for `url`, stamped with the current time.
    pub fn put(&self, url: &str, bytes: &[u8]) -> Result<()> {
        let envelope = DiskEnvelope {
            written_at_ms: self.clock.now().timestamp_millis(),
            bytes: bytes.to_vec(),
        };
        let raw = bincode::serialize(&envelope)
            .map_err(|e| super::CacheError::Storage(e.to_string()))?;
        self.store.save(&hash_url(url), &raw)?;
        Ok(())
    }

    pub fn remove(&self, url: &str) -> Result<()> {
        self.store.delete(&hash_url(url))?;
        Ok(())
    }

    /// Delete every expired or unreadable entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.store.keys()? {
            if !is_cache_key(&key) {
                continue;
            }

            let keep = match self.store.load(&key)? {
                Some(raw) => bincode::deserialize::<DiskEnvelope>(&raw)
                    .map(|envelope| !self.is_expired(envelope.written_at_ms))
                    .unwrap_or(false),
                None => true,
            };
            if !keep {
                self.store.delete(&key)?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Swept {} expired disk cache entries", removed);
        }
        Ok(removed)
    }

    /// Delete every cached entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        Ok(self.store.delete_where(&is_cache_key)?)
    }

    fn is_expired(&self, written_at_ms: i64) -> bool {
        match DateTime::<Utc>::from_timestamp_millis(written_at_ms) {
            Some(written_at) => self.clock.now() - written_at > self.ttl,
            None => true,
        }
    }
}

/// Cache keys are lowercase hex SHA-256 digests.
fn is_cache_key(key: &str) -> bool {
    key.len() == 64 && key.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

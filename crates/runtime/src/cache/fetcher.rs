//! Remote byte fetchers.

use async_trait::async_trait;

use super::Result;

/// Fetches the raw bytes behind a URL.
///
/// Timeouts and retries are the fetcher's concern; the cache treats any
/// error as a miss that is never cached.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::AssetFetcher;
    use crate::cache::{CacheError, Result};

    /// [`AssetFetcher`] over HTTP(S) using `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: reqwest::Client,
    }

    impl HttpFetcher {
        pub fn new() -> Self {
            Self::with_client(reqwest::Client::new())
        }

        /// Fetcher whose requests time out after `timeout`.
        pub fn with_timeout(timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| CacheError::Storage(format!("HTTP client setup failed: {e}")))?;
            Ok(Self::with_client(client))
        }

        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Default for HttpFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl AssetFetcher for HttpFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| CacheError::fetch(url, format!("request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(CacheError::fetch(url, format!("HTTP {}", response.status())));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| CacheError::fetch(url, format!("body read failed: {e}")))?;

            tracing::debug!("Fetched {} ({} bytes)", url, body.len());
            Ok(body.to_vec())
        }
    }
}

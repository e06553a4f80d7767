//! HTTP fetch source.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{Client, redirect};
use tracing::debug;

use crate::domain::entities::ResourceKey;
use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::{ByteStream, FetchSource};
use crate::infrastructure::config::LoaderConfig;

/// Fetches images over HTTP(S) with reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher honoring the timeouts and redirect limit of `config`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: &LoaderConfig) -> LoadResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| LoadError::setup(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wraps an already configured client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchSource for HttpFetcher {
    async fn open(&self, key: &ResourceKey) -> Result<ByteStream, LoadError> {
        debug!(key = %key, "Downloading image from network");

        let response = self
            .client
            .get(key.as_str())
            .send()
            .await
            .map_err(|e| LoadError::source_unavailable(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::source_unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        Ok(response
            .bytes_stream()
            .map_err(|e| LoadError::source_unavailable(format!("Failed to read body: {e}")))
            .boxed())
    }
}

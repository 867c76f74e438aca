//! HTTP tile source backed by reqwest

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

use super::{FetchError, Result, TileSource};
use crate::config::SourceConfig;
use crate::jobs::TileJob;

/// Downloads tiles with a single shared reqwest client.
///
/// One request per job: failures are reported as-is, never retried.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: Client,
}

impl HttpTileSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<Bytes> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        debug!(%url, "Requesting tile");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_redirect() {
                FetchError::TooManyRedirects
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(format!("Failed to read body: {}", e))
            }
        })?;

        debug!(%url, size = bytes.len(), "Tile downloaded");

        Ok(bytes)
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch(&self, job: &TileJob) -> Result<Bytes> {
        self.get(&job.url).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

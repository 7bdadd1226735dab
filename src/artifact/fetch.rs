// ABOUTME: Retrieves release bundles from http(s) URLs or local files.
// ABOUTME: One attempt per call, bounded by a caller-supplied timeout.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::ArtifactSource;

/// Errors from fetching an artifact.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetching {source_desc} timed out after {secs}s")]
    Timeout { source_desc: String, secs: u64 },

    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Fetches the raw bytes of a release bundle.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, source: &ArtifactSource, timeout: Duration) -> Result<Bytes, FetchError>;
}

/// Fetcher backed by reqwest for remote locators and tokio::fs for local ones.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_url(&self, url: &url::Url, timeout: Duration) -> Result<Bytes, FetchError> {
        let network = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    source_desc: url.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(network)
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, source: &ArtifactSource, timeout: Duration) -> Result<Bytes, FetchError> {
        tracing::debug!("Fetching artifact from {}", source);

        let fetch = async {
            match source {
                ArtifactSource::Http(url) => self.fetch_url(url, timeout).await,
                ArtifactSource::File(path) => tokio::fs::read(path)
                    .await
                    .map(Bytes::from)
                    .map_err(|source| FetchError::File {
                        path: path.clone(),
                        source,
                    }),
            }
        };

        // reqwest's own timeout covers the request; this bounds file reads
        // and slow body transfers as well.
        tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout {
                source_desc: source.to_string(),
                secs: timeout.as_secs(),
            })?
    }
}

//! Remote retrieval of datasets
//!
//! A fetch is a single request: no retries and no backoff. Any non-2xx
//! response or transport failure is returned as [`DlpError::Network`] and
//! ends the calling stage.

use crate::document::Document;
use async_trait::async_trait;
use dlp_common::{DlpError, Result};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("dlp/", env!("CARGO_PKG_VERSION"));

/// Source of raw bytes and HTML documents
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the body at `url`
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Retrieve the body at `url` as a queryable HTML document
    async fn fetch_document(&self, url: &str) -> Result<Document> {
        let body = self.fetch_bytes(url).await?;
        Ok(Document::from_bytes(url, body))
    }
}

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(options: HttpOptions) -> Result<Self> {
        let mut builder = Client::builder().user_agent(options.user_agent);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| DlpError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpFetcher {
    /// Send a GET and reject non-2xx responses
    async fn get(&self, url: &str) -> Result<Response> {
        debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DlpError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DlpError::network(url, format!("HTTP {}", status)));
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let body = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| DlpError::network(url, e))?;

        debug!(url, bytes = body.len(), "Response received");
        Ok(body.to_vec())
    }

    /// Decodes with the charset from `Content-Type`; malformed sequences are replaced
    async fn fetch_document(&self, url: &str) -> Result<Document> {
        let html = self
            .get(url)
            .await?
            .text()
            .await
            .map_err(|e| DlpError::network(url, e))?;

        debug!(url, bytes = html.len(), "Document received");
        Ok(Document::new(url, html))
    }
}

// src/fetch.rs
//! Changelog page transport: `fetch(url) -> raw text or failure`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

pub const USER_AGENT: &str = "Mozilla/5.0 (Competitor Monitor)";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Raw page text. Empty (or whitespace-only) bodies are an error.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher with a bounded timeout.
///
/// With `insecure_retry` set, a connection-level failure (typically a TLS
/// handshake problem) is retried once with certificate verification disabled.
pub struct HttpFetcher {
    client: reqwest::Client,
    insecure: Option<reqwest::Client>,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, insecure_retry: bool) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(timeout_secs.max(1));
        let client = Self::builder(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        let insecure = if insecure_retry {
            Some(
                Self::builder(timeout)
                    .danger_accept_invalid_certs(true)
                    .build()
                    .map_err(|e| FetchError::Client(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self { client, insecure })
    }

    fn builder(timeout: Duration) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
    }

    async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let resp = client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match Self::get_text(&self.client, url).await {
            Err(FetchError::Http(e)) if e.is_connect() => match &self.insecure {
                Some(insecure) => {
                    tracing::warn!(%url, error = %e, "connect failed; retrying without TLS verification");
                    Self::get_text(insecure, url).await
                }
                None => Err(FetchError::Http(e)),
            },
            other => other,
        }
    }
}

//! Upstream HTTP access for listing pages.
//!
//! The pager only depends on the [`Fetcher`] trait, so tests and alternative
//! transports can stand in for the real HTTP client.
//!
//! # Failure Policy
//!
//! - Network errors and non-2xx responses are both failures
//! - No retries: a failed page surfaces immediately to the caller

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Why a single GET failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{cause}")]
pub struct FetchError {
    /// HTTP status when the server answered with a non-success code.
    pub status: Option<u16>,
    pub cause: String,
}

/// Performs one HTTP GET with query parameters and returns the raw body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url, query: &[(String, String)]) -> Result<String, FetchError>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with a per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn get(&self, url: &Url, query: &[(String, String)]) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "Request failed");
                FetchError {
                    status: e.status().map(|s| s.as_u16()),
                    cause: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Upstream returned non-success status");
            return Err(FetchError {
                status: Some(status.as_u16()),
                cause: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError {
            status: Some(status.as_u16()),
            cause: e.to_string(),
        })?;

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

//! Retrieval of source PDFs over HTTP.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while retrieving the source document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Source responded with a non-success status.
    #[error("Unexpected status {status} fetching {url}")]
    UnexpectedStatus {
        /// HTTP status returned by the source.
        status: StatusCode,
        /// URL that was requested.
        url: String,
    },
}

/// Downloads raw PDF bytes from a caller-supplied URL.
pub struct PdfFetcher {
    client: Client,
}

impl PdfFetcher {
    /// Construct a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("papernotes/0.2")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Download the document at `url`, returning its raw bytes.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let error = FetchError::UnexpectedStatus {
                status: response.status(),
                url: url.to_string(),
            };
            tracing::error!(error = %error, "Failed to fetch source document");
            return Err(error);
        }
        let bytes = response.bytes().await?;
        tracing::debug!(url, bytes = bytes.len(), "Fetched source document");
        Ok(bytes.to_vec())
    }
}

//! Client for the document partitioning collaborator.
//!
//! Speaks the Unstructured-style `general/v0/general` API: the PDF is posted
//! as a multipart upload with a processing strategy flag, and the response is
//! a flat list of text elements with page metadata.

use crate::config::Config;
use crate::pipeline::TextSegment;
use reqwest::{Client, StatusCode, multipart};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

const PARTITION_STRATEGY: &str = "hi_res";

/// Errors raised while partitioning a document into text segments.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// Partitioning credential is missing; the call is never attempted.
    #[error("UNSTRUCTURED_API_KEY is not set")]
    MissingApiKey,
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Collaborator responded with an unexpected status code.
    #[error("Unexpected partition response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the collaborator.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// One element of the partition response.
#[derive(Debug, Deserialize)]
struct PartitionElement {
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// HTTP client for the partitioning collaborator.
pub struct PartitionClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PartitionClient {
    /// Construct a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, PartitionError> {
        let client = Client::builder()
            .user_agent("papernotes/0.2")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.unstructured_api_url.clone(),
            api_key: config.unstructured_api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/general/v0/general",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Partition raw PDF bytes into ordered text segments.
    ///
    /// Fails before any network activity when the collaborator credential is
    /// not configured. Elements with empty text are dropped; the rest keep
    /// the collaborator's ordering, which is the document's reading order.
    pub async fn partition(&self, pdf: Vec<u8>) -> Result<Vec<TextSegment>, PartitionError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(PartitionError::MissingApiKey)?;

        let part = multipart::Part::bytes(pdf)
            .file_name("paper.pdf")
            .mime_str("application/pdf")?;
        let form = multipart::Form::new()
            .part("files", part)
            .text("strategy", PARTITION_STRATEGY);

        let response = self
            .client
            .post(self.endpoint())
            .header("unstructured-api-key", api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PartitionError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Partition request failed");
            return Err(error);
        }

        let elements: Vec<PartitionElement> = response.json().await?;
        let segments: Vec<TextSegment> = elements
            .into_iter()
            .filter(|element| !element.text.trim().is_empty())
            .map(|element| {
                let page = page_number(&element.metadata);
                TextSegment {
                    content: element.text,
                    metadata: element.metadata,
                    page,
                }
            })
            .collect();

        tracing::debug!(segments = segments.len(), "Partitioned source document");
        Ok(segments)
    }
}

fn page_number(metadata: &Map<String, Value>) -> Option<u32> {
    metadata
        .get("page_number")
        .and_then(Value::as_u64)
        .map(|page| page as u32)
}

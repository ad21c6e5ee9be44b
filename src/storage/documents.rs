//! HTTP client for the relational paper store.
//!
//! Speaks a PostgREST-style API: one `POST rest/v1/<table>` per insert with
//! `Prefer: return=representation` so the stored row (including its assigned
//! id) comes back in the response. Rows serialize by field name, never by
//! position, so the insert does not depend on the table's declared column
//! order.

use crate::config::Config;
use crate::extraction::PaperNote;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Logical table holding one row per processed paper.
pub const PAPERS_TABLE: &str = "papers";

/// Errors returned while interacting with the relational store.
#[derive(Debug, Error)]
pub enum PaperStoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Store responded with an unexpected status code.
    #[error("Unexpected store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Insert succeeded but the store returned no row representation.
    #[error("Store returned no representation of the inserted row")]
    MissingRepresentation,
}

/// Row shape for the papers table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Identifier assigned by the store; absent on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// URL the paper was fetched from.
    pub source_url: String,
    /// Display name supplied by the caller.
    pub name: String,
    /// Notes derived from the paper, stored as a JSON column.
    pub notes: Vec<PaperNote>,
    /// Full partitioned text of the paper.
    pub full_text: String,
}

/// Interface to the relational paper store.
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Insert one paper row and return it with its assigned identifier.
    async fn insert_paper(&self, record: PaperRecord) -> Result<PaperRecord, PaperStoreError>;
}

/// PostgREST-style HTTP implementation of [`PaperStore`].
pub struct RestPaperStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestPaperStore {
    /// Construct a new client using the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, PaperStoreError> {
        let client = Client::builder()
            .user_agent("papernotes/0.2")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let base_url =
            normalize_base_url(&config.database_url).map_err(PaperStoreError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized paper store client");
        Ok(Self {
            client,
            base_url,
            api_key: config.database_api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{PAPERS_TABLE}",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PaperStore for RestPaperStore {
    async fn insert_paper(&self, record: PaperRecord) -> Result<PaperRecord, PaperStoreError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PaperStoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Paper insert failed");
            return Err(error);
        }

        let mut rows: Vec<PaperRecord> = response.json().await?;
        let stored = rows
            .pop()
            .ok_or(PaperStoreError::MissingRepresentation)?;
        tracing::debug!(id = ?stored.id, name = %stored.name, "Paper record inserted");
        Ok(stored)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

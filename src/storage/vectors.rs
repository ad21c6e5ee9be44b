//! HTTP client for the Qdrant vector store.

use crate::config::Config;
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::pipeline::TextChunk;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use thiserror::Error;

/// Errors returned while writing chunks to the vector store.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
}

/// Interface to the chunk-level vector store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed every chunk and upsert one entry per chunk under
    /// document-identifying metadata. Returns the number of entries written.
    async fn add_chunks(
        &self,
        collection: &str,
        source_url: &str,
        paper_name: &str,
        chunks: Vec<TextChunk>,
    ) -> Result<usize, VectorStoreError>;
}

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantVectorStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    embedding_client: Box<dyn EmbeddingClient>,
}

impl QdrantVectorStore {
    /// Construct a new client using the loaded configuration.
    pub fn new(
        config: &Config,
        embedding_client: Box<dyn EmbeddingClient>,
    ) -> Result<Self, VectorStoreError> {
        let client = Client::builder()
            .user_agent("papernotes/0.2")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let base_url =
            normalize_base_url(&config.qdrant_url).map_err(VectorStoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %config
                .qdrant_api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
            embedding_client,
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection created");
        })
        .await
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, VectorStoreError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = VectorStoreError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut req = self.client.request(method, format!("{base}/{path}"));
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), VectorStoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = VectorStoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorStore {
    async fn add_chunks(
        &self,
        collection: &str,
        source_url: &str,
        paper_name: &str,
        chunks: Vec<TextChunk>,
    ) -> Result<usize, VectorStoreError> {
        let (chunks, skipped) = dedupe_chunks(chunks);
        if skipped > 0 {
            tracing::debug!(skipped, "Skipped duplicate chunks within request");
        }
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = self.embedding_client.generate_embeddings(texts).await?;
        debug_assert_eq!(chunks.len(), vectors.len());

        let now = current_timestamp_rfc3339();
        let points: Vec<Value> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let payload = build_chunk_payload(&chunk, source_url, paper_name, &now);
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": vector,
                    "payload": payload,
                })
            })
            .collect();

        let point_count = points.len();
        let response = self
            .request(Method::PUT, &format!("collections/{collection}/points"))
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection, points = point_count, "Chunks indexed");
        })
        .await?;

        Ok(point_count)
    }
}

/// Build the payload object stored alongside each indexed chunk.
fn build_chunk_payload(
    chunk: &TextChunk,
    source_url: &str,
    paper_name: &str,
    timestamp_rfc3339: &str,
) -> Value {
    let mut payload = Map::new();
    payload.insert("text".into(), Value::String(chunk.content.clone()));
    payload.insert(
        "chunk_hash".into(),
        Value::String(compute_chunk_hash(&chunk.content)),
    );
    payload.insert("source_url".into(), Value::String(source_url.to_string()));
    payload.insert("paper_name".into(), Value::String(paper_name.to_string()));
    payload.insert(
        "timestamp".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    if let Some(page) = chunk.page {
        payload.insert("page_number".into(), Value::from(page));
    }
    for (key, value) in &chunk.metadata {
        payload.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Value::Object(payload)
}

/// Remove duplicate chunks within a request, keeping the first occurrence.
fn dedupe_chunks(chunks: Vec<TextChunk>) -> (Vec<TextChunk>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut skipped = 0;

    for chunk in chunks {
        if chunk.content.trim().is_empty() {
            continue;
        }
        if seen.insert(compute_chunk_hash(&chunk.content)) {
            kept.push(chunk);
        } else {
            skipped += 1;
        }
    }

    (kept, skipped)
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for payload storage.
fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

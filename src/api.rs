//! HTTP surface for papernotes.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `GET /` – Liveness probe.
//! - `POST /take_notes` – Run the full pipeline for one paper: fetch the PDF,
//!   prune excluded pages, partition, chunk, extract notes, and persist to
//!   both stores. Returns the extracted notes as JSON.
//! - `GET /metrics` – Observe ingestion counters.
//!
//! The handlers are thin shims; all orchestration lives in the pipeline
//! service behind the [`NotesApi`] trait.

use crate::document::PartitionError;
use crate::extraction::PaperNote;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{NotesApi, PipelineError, TakeNotesRequest};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the note-taking API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: NotesApi + 'static,
{
    Router::new()
        .route("/", get(liveness))
        .route("/take_notes", post(take_notes::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Liveness probe for load balancers and smoke tests.
async fn liveness() -> &'static str {
    "ok"
}

/// Request body for the `POST /take_notes` endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakeNotesBody {
    /// URL of the source PDF.
    paper_url: String,
    /// Display name stored with the paper record.
    name: String,
    /// Optional 1-indexed pages to remove before processing.
    #[serde(default)]
    pages_to_delete: Vec<u32>,
}

/// Run the pipeline for one paper and return the extracted notes.
async fn take_notes<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<TakeNotesBody>,
) -> Result<Json<Vec<PaperNote>>, AppError>
where
    S: NotesApi,
{
    let request = TakeNotesRequest {
        paper_url: body.paper_url,
        name: body.name,
        pages_to_delete: body.pages_to_delete,
    };
    let outcome = service.take_notes(request).await?;
    tracing::info!(
        notes = outcome.notes.len(),
        chunks = outcome.chunks_indexed,
        paper_id = ?outcome.paper_id,
        "Take-notes request completed"
    );
    Ok(Json(outcome.notes))
}

/// Return a concise metrics snapshot with ingestion counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: NotesApi,
{
    Json(service.metrics_snapshot())
}

struct AppError(PipelineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::Fetch(_) | PipelineError::Extraction(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Partition(PartitionError::MissingApiKey) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::Partition(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Prune(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Chunking(_) | PipelineError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({
            "stage": self.0.stage().to_string(),
            "error": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::extraction::{ExtractionError, PaperNote};
    use crate::metrics::MetricsSnapshot;
    use crate::pipeline::{NotesApi, PipelineError, PipelineOutcome, TakeNotesRequest};
    use crate::storage::{PersistenceError, VectorStoreError};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    struct StubNotesService {
        calls: Arc<Mutex<Vec<TakeNotesRequest>>>,
        response: fn() -> Result<PipelineOutcome, PipelineError>,
    }

    impl StubNotesService {
        fn new(response: fn() -> Result<PipelineOutcome, PipelineError>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                response,
            }
        }
    }

    #[async_trait]
    impl NotesApi for StubNotesService {
        async fn take_notes(
            &self,
            request: TakeNotesRequest,
        ) -> Result<PipelineOutcome, PipelineError> {
            self.calls.lock().await.push(request);
            (self.response)()
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                papers_processed: 1,
                notes_extracted: 2,
                chunks_indexed: 3,
            }
        }
    }

    fn success_outcome() -> Result<PipelineOutcome, PipelineError> {
        Ok(PipelineOutcome {
            notes: vec![PaperNote {
                text: "X uses Y".into(),
                page_numbers: vec![1],
            }],
            chunks_indexed: 2,
            paper_id: Some(7),
        })
    }

    fn partial_persistence_failure() -> Result<PipelineOutcome, PipelineError> {
        Err(PipelineError::Persistence(
            PersistenceError::PartialVector(VectorStoreError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "upsert failed".into(),
            }),
        ))
    }

    fn extraction_failure() -> Result<PipelineOutcome, PipelineError> {
        Err(PipelineError::Extraction(
            ExtractionError::NoStructuredResponse,
        ))
    }

    async fn post_take_notes(
        service: Arc<StubNotesService>,
    ) -> (StatusCode, serde_json::Value) {
        let app = create_router(service);
        let payload = json!({
            "paperUrl": "https://example.org/doc.pdf",
            "name": "Paper A",
            "pagesToDelete": [2]
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/take_notes")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn liveness_endpoint_returns_ok() {
        let service = Arc::new(StubNotesService::new(success_outcome));
        let app = create_router(service);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn take_notes_returns_the_extracted_notes() {
        let service = Arc::new(StubNotesService::new(success_outcome));
        let (status, body) = post_take_notes(service.clone()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{ "text": "X uses Y", "pageNumbers": [1] }]));

        let calls = service.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].paper_url, "https://example.org/doc.pdf");
        assert_eq!(calls[0].name, "Paper A");
        assert_eq!(calls[0].pages_to_delete, vec![2]);
    }

    #[tokio::test]
    async fn partial_persistence_is_never_reported_as_success() {
        let service = Arc::new(StubNotesService::new(partial_persistence_failure));
        let (status, body) = post_take_notes(service).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stage"], "persist");
        assert!(
            body["error"]
                .as_str()
                .expect("error string")
                .contains("Vector write failed")
        );
    }

    #[tokio::test]
    async fn extraction_failure_maps_to_bad_gateway() {
        let service = Arc::new(StubNotesService::new(extraction_failure));
        let (status, body) = post_take_notes(service).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["stage"], "extract");
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_counters() {
        let service = Arc::new(StubNotesService::new(success_outcome));
        let app = create_router(service);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["papers_processed"], 1);
        assert_eq!(body["chunks_indexed"], 3);
    }
}

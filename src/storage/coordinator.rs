//! Coordinated dual-write persistence with partial-failure reporting.

use crate::extraction::PaperNote;
use crate::pipeline::{TakeNotesRequest, TextChunk};
use crate::storage::documents::{PaperRecord, PaperStore, PaperStoreError};
use crate::storage::vectors::{VectorIndex, VectorStoreError};
use std::sync::Arc;
use thiserror::Error;

/// Errors describing how the dual write failed.
///
/// The two writes are independent and there is no compensating rollback: a
/// partial failure leaves an orphaned record on the side that succeeded, and
/// callers decide on manual reconciliation.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Relational insert failed while the vector write succeeded.
    #[error("Relational insert failed while the vector write succeeded: {0}")]
    PartialRelational(#[source] PaperStoreError),
    /// Vector write failed while the relational insert succeeded.
    #[error("Vector write failed while the relational insert succeeded: {0}")]
    PartialVector(#[source] VectorStoreError),
    /// Both writes failed.
    #[error("Both persistence writes failed; relational: {relational}; vector: {vector}")]
    Total {
        /// Error reported by the relational store.
        relational: PaperStoreError,
        /// Error reported by the vector store.
        vector: VectorStoreError,
    },
}

impl PersistenceError {
    /// Whether this outcome left one side durably written.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialRelational(_) | Self::PartialVector(_))
    }
}

/// Summary of a fully successful dual write.
#[derive(Debug, Clone)]
pub struct PersistOutcome {
    /// The relational record as stored, with its assigned identifier.
    pub record: PaperRecord,
    /// Number of chunk entries written to the vector store.
    pub chunks_indexed: usize,
}

/// Runs the relational insert and the vector upsert as one settled pair.
pub struct PersistenceCoordinator {
    papers: Arc<dyn PaperStore>,
    vectors: Arc<dyn VectorIndex>,
    collection: String,
}

impl PersistenceCoordinator {
    /// Build a coordinator over the two store handles.
    pub fn new(
        papers: Arc<dyn PaperStore>,
        vectors: Arc<dyn VectorIndex>,
        collection: String,
    ) -> Self {
        Self {
            papers,
            vectors,
            collection,
        }
    }

    /// Persist one pipeline run's results into both stores.
    ///
    /// Both writes are launched together and both are always awaited; one
    /// side failing never short-circuits the other. The combined outcome
    /// distinguishes full success, partial failure naming the failed side,
    /// and total failure carrying both errors.
    pub async fn persist(
        &self,
        request: &TakeNotesRequest,
        full_text: String,
        notes: Vec<PaperNote>,
        chunks: Vec<TextChunk>,
    ) -> Result<PersistOutcome, PersistenceError> {
        let record = PaperRecord {
            id: None,
            source_url: request.paper_url.clone(),
            name: request.name.clone(),
            notes,
            full_text,
        };

        let insert = self.papers.insert_paper(record);
        let upsert = self.vectors.add_chunks(
            &self.collection,
            &request.paper_url,
            &request.name,
            chunks,
        );

        let (inserted, upserted) = tokio::join!(insert, upsert);
        match (inserted, upserted) {
            (Ok(record), Ok(chunks_indexed)) => {
                tracing::info!(
                    id = ?record.id,
                    chunks = chunks_indexed,
                    "Persisted paper record and chunk vectors"
                );
                Ok(PersistOutcome {
                    record,
                    chunks_indexed,
                })
            }
            (Err(relational), Ok(_)) => {
                tracing::error!(error = %relational, "Relational insert failed; vector write succeeded");
                Err(PersistenceError::PartialRelational(relational))
            }
            (Ok(_), Err(vector)) => {
                tracing::error!(error = %vector, "Vector write failed; relational insert succeeded");
                Err(PersistenceError::PartialVector(vector))
            }
            (Err(relational), Err(vector)) => {
                tracing::error!(
                    relational = %relational,
                    vector = %vector,
                    "Both persistence writes failed"
                );
                Err(PersistenceError::Total { relational, vector })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubPaperStore {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PaperStore for StubPaperStore {
        async fn insert_paper(&self, record: PaperRecord) -> Result<PaperRecord, PaperStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PaperStoreError::UnexpectedStatus {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "insert failed".into(),
                })
            } else {
                Ok(PaperRecord {
                    id: Some(1),
                    ..record
                })
            }
        }
    }

    struct StubVectorIndex {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for StubVectorIndex {
        async fn add_chunks(
            &self,
            _collection: &str,
            _source_url: &str,
            _paper_name: &str,
            chunks: Vec<TextChunk>,
        ) -> Result<usize, VectorStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(VectorStoreError::UnexpectedStatus {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "upsert failed".into(),
                })
            } else {
                Ok(chunks.len())
            }
        }
    }

    fn coordinator(
        paper_fail: bool,
        vector_fail: bool,
    ) -> (
        PersistenceCoordinator,
        Arc<StubPaperStore>,
        Arc<StubVectorIndex>,
    ) {
        let papers = Arc::new(StubPaperStore {
            fail: paper_fail,
            calls: AtomicUsize::new(0),
        });
        let vectors = Arc::new(StubVectorIndex {
            fail: vector_fail,
            calls: AtomicUsize::new(0),
        });
        let coordinator = PersistenceCoordinator::new(
            papers.clone() as Arc<dyn PaperStore>,
            vectors.clone() as Arc<dyn VectorIndex>,
            "papers".into(),
        );
        (coordinator, papers, vectors)
    }

    fn request() -> TakeNotesRequest {
        TakeNotesRequest {
            paper_url: "https://example.org/doc.pdf".into(),
            name: "Paper A".into(),
            pages_to_delete: vec![],
        }
    }

    fn chunks() -> Vec<TextChunk> {
        vec![TextChunk {
            content: "chunk".into(),
            metadata: Map::new(),
            page: Some(1),
        }]
    }

    #[tokio::test]
    async fn both_writes_succeeding_reports_full_success() {
        let (coordinator, papers, vectors) = coordinator(false, false);
        let outcome = coordinator
            .persist(&request(), "full text".into(), vec![], chunks())
            .await
            .expect("dual write succeeds");

        assert_eq!(outcome.record.id, Some(1));
        assert_eq!(outcome.chunks_indexed, 1);
        assert_eq!(papers.calls.load(Ordering::SeqCst), 1);
        assert_eq!(vectors.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn vector_failure_names_the_vector_side() {
        let (coordinator, papers, _) = coordinator(false, true);
        let error = coordinator
            .persist(&request(), "full text".into(), vec![], chunks())
            .await
            .expect_err("vector side fails");

        assert!(matches!(error, PersistenceError::PartialVector(_)));
        assert!(error.is_partial());
        // the relational insert was still attempted
        assert_eq!(papers.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn relational_failure_names_the_relational_side() {
        let (coordinator, _, vectors) = coordinator(true, false);
        let error = coordinator
            .persist(&request(), "full text".into(), vec![], chunks())
            .await
            .expect_err("relational side fails");

        assert!(matches!(error, PersistenceError::PartialRelational(_)));
        assert!(error.is_partial());
        assert_eq!(vectors.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_failing_is_total_not_partial() {
        let (coordinator, papers, vectors) = coordinator(true, true);
        let error = coordinator
            .persist(&request(), "full text".into(), vec![], chunks())
            .await
            .expect_err("both sides fail");

        assert!(matches!(error, PersistenceError::Total { .. }));
        assert!(!error.is_partial());
        assert_eq!(papers.calls.load(Ordering::SeqCst), 1);
        assert_eq!(vectors.calls.load(Ordering::SeqCst), 1);
    }
}

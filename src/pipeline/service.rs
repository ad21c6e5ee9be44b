//! Pipeline service coordinating fetch, pruning, partitioning, chunking,
//! extraction, and persistence.

use crate::{
    config::Config,
    document::{PartitionClient, PdfFetcher, prune_pages},
    embedding::OllamaEmbeddingClient,
    extraction::NoteExtractor,
    metrics::{IngestMetrics, MetricsSnapshot},
    pipeline::{
        chunking::Chunker,
        types::{PipelineError, PipelineOutcome, TakeNotesRequest, TextSegment},
    },
    storage::{PersistenceCoordinator, QdrantVectorStore, RestPaperStore},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Coordinates the full note-taking pipeline for one document at a time.
///
/// The service owns long-lived handles to the fetcher, partitioning client,
/// extractor, and persistence coordinator so every HTTP request reuses the
/// same components. Construct the service once near process start and share
/// it through an `Arc`. Stages run strictly in sequence; only the final dual
/// write runs its two operations concurrently. Nothing is cached or shared
/// across runs, so concurrent runs never touch the same data.
pub struct NotesService {
    fetcher: PdfFetcher,
    partitioner: PartitionClient,
    extractor: NoteExtractor,
    coordinator: PersistenceCoordinator,
    metrics: Arc<IngestMetrics>,
    chunk_size: usize,
    chunk_overlap: usize,
}

/// Abstraction over the pipeline used by external surfaces and tests.
#[async_trait]
pub trait NotesApi: Send + Sync {
    /// Run the full pipeline for one source document.
    async fn take_notes(
        &self,
        request: TakeNotesRequest,
    ) -> Result<PipelineOutcome, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl NotesService {
    /// Build a new pipeline service, initializing backing stores as needed.
    pub async fn new(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let fetcher = PdfFetcher::new(timeout).expect("Failed to construct PDF fetcher");
        let partitioner =
            PartitionClient::new(config).expect("Failed to construct partition client");
        let extractor = NoteExtractor::new(config).expect("Failed to construct note extractor");

        let embedding_client =
            OllamaEmbeddingClient::new(config).expect("Failed to construct embedding client");
        let vectors = QdrantVectorStore::new(config, Box::new(embedding_client))
            .expect("Failed to connect to Qdrant");
        tracing::debug!(
            collection = %config.qdrant_collection_name,
            vector_size = config.embedding_dimension,
            "Ensuring chunk collection"
        );
        vectors
            .create_collection_if_not_exists(
                &config.qdrant_collection_name,
                config.embedding_dimension as u64,
            )
            .await
            .expect("Failed to ensure Qdrant collection exists");
        let papers = RestPaperStore::new(config).expect("Failed to construct paper store");
        let coordinator = PersistenceCoordinator::new(
            Arc::new(papers),
            Arc::new(vectors),
            config.qdrant_collection_name.clone(),
        );

        Self {
            fetcher,
            partitioner,
            extractor,
            coordinator,
            metrics: Arc::new(IngestMetrics::new()),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    /// Run the pipeline: fetch, prune, partition, chunk, extract, persist.
    ///
    /// Each stage consumes the previous stage's output; any failure aborts
    /// the run and reports the originating stage through
    /// [`PipelineError::stage`]. No stage is retried here.
    pub async fn take_notes(
        &self,
        request: TakeNotesRequest,
    ) -> Result<PipelineOutcome, PipelineError> {
        tracing::info!(
            url = %request.paper_url,
            name = %request.name,
            excluded_pages = request.pages_to_delete.len(),
            "Processing paper"
        );

        let raw = self.fetcher.fetch(&request.paper_url).await?;
        let pruned = prune_pages(&raw, &request.pages_to_delete)?;
        let segments = self.partitioner.partition(pruned).await?;

        let chunker = Chunker::new(self.chunk_size, self.chunk_overlap)?;
        let chunks = chunker.split(&segments);
        let full_text = join_segments(&segments);

        let notes = self.extractor.extract(&full_text).await?;

        let outcome = self
            .coordinator
            .persist(&request, full_text, notes.clone(), chunks)
            .await?;

        self.metrics
            .record_paper(notes.len() as u64, outcome.chunks_indexed as u64);
        tracing::info!(
            url = %request.paper_url,
            notes = notes.len(),
            chunks = outcome.chunks_indexed,
            paper_id = ?outcome.record.id,
            "Paper processed"
        );

        Ok(PipelineOutcome {
            notes,
            chunks_indexed: outcome.chunks_indexed,
            paper_id: outcome.record.id,
        })
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Concatenate segment contents in reading order for prompting and storage.
fn join_segments(segments: &[TextSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl NotesApi for NotesService {
    async fn take_notes(
        &self,
        request: TakeNotesRequest,
    ) -> Result<PipelineOutcome, PipelineError> {
        NotesService::take_notes(self, request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        NotesService::metrics_snapshot(self)
    }
}

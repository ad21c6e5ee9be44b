//! Core data types and error definitions for the ingestion pipeline.

use crate::document::{FetchError, PartitionError, PdfError};
use crate::extraction::{ExtractionError, PaperNote};
use crate::pipeline::chunking::ChunkingError;
use crate::storage::PersistenceError;
use serde_json::{Map, Value};
use thiserror::Error;

/// Caller-supplied reference to a source document; immutable for one run.
#[derive(Debug, Clone)]
pub struct TakeNotesRequest {
    /// URL of the source PDF.
    pub paper_url: String,
    /// Human-readable display name for the paper.
    pub name: String,
    /// 1-indexed pages to remove before partitioning, ascending.
    pub pages_to_delete: Vec<u32>,
}

/// One unit of extracted text with its page/position metadata, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    /// Extracted text content.
    pub content: String,
    /// Metadata reported by the partitioning collaborator.
    pub metadata: Map<String, Value>,
    /// 1-indexed page the segment originates from, when known.
    pub page: Option<u32>,
}

/// A bounded-size window over a segment, sized for embedding storage.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// Windowed text content.
    pub content: String,
    /// Metadata inherited from the originating segment.
    pub metadata: Map<String, Value>,
    /// Page inherited from the originating segment.
    pub page: Option<u32>,
}

/// Pipeline stages, in execution order, used for failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Downloading the source document.
    Fetch,
    /// Removing excluded pages.
    Prune,
    /// Partitioning bytes into text segments.
    Partition,
    /// Windowing segments into chunks.
    Chunk,
    /// Deriving structured notes from the full text.
    Extract,
    /// Writing to the relational and vector stores.
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Prune => "prune",
            Self::Partition => "partition",
            Self::Chunk => "chunk",
            Self::Extract => "extract",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Errors emitted by the ingestion pipeline, one variant per stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source document could not be retrieved.
    #[error("Failed to fetch source document: {0}")]
    Fetch(#[from] FetchError),
    /// Source bytes were not a valid document or a page index was invalid.
    #[error("Failed to prune pages: {0}")]
    Prune(#[from] PdfError),
    /// Partitioning collaborator rejected the document or was unreachable.
    #[error("Failed to partition document: {0}")]
    Partition(#[from] PartitionError),
    /// Chunking configuration was invalid.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Model backend gave no usable structured payload.
    #[error("Failed to extract notes: {0}")]
    Extraction(#[from] ExtractionError),
    /// One or both persistence writes failed.
    #[error("Failed to persist results: {0}")]
    Persistence(#[from] PersistenceError),
}

impl PipelineError {
    /// The stage this error originated from.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch(_) => Stage::Fetch,
            Self::Prune(_) => Stage::Prune,
            Self::Partition(_) => Stage::Partition,
            Self::Chunking(_) => Stage::Chunk,
            Self::Extraction(_) => Stage::Extract,
            Self::Persistence(_) => Stage::Persist,
        }
    }
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Notes extracted from the paper, as persisted.
    pub notes: Vec<PaperNote>,
    /// Number of chunks upserted into the vector store.
    pub chunks_indexed: usize,
    /// Identifier assigned to the relational record, when reported.
    pub paper_id: Option<i64>,
}

//! The ingestion pipeline: chunking, orchestration, and shared types.

pub mod chunking;
mod service;
pub mod types;

pub use chunking::{Chunker, ChunkingError};
pub use service::{NotesApi, NotesService};
pub use types::{
    PipelineError, PipelineOutcome, Stage, TakeNotesRequest, TextChunk, TextSegment,
};

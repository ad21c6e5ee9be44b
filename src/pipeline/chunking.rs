//! Deterministic character-window chunking.
//!
//! Segments are windowed into chunks of at most `chunk_size` characters, and
//! every window after the first re-includes the trailing `chunk_overlap`
//! characters of its predecessor. The windows are pure functions of the
//! input: dropping the first `chunk_overlap` characters of chunk *i* and
//! appending the rest to chunk *i−1* reconstructs the segment text exactly,
//! and re-chunking that reconstruction yields identical boundaries.

use crate::pipeline::types::{TextChunk, TextSegment};
use thiserror::Error;

/// Errors produced while validating chunking parameters.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunk size of zero can never emit a window.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for the window to advance.
    #[error("chunk overlap {overlap} must be strictly less than chunk size {size}")]
    OverlapExceedsChunkSize {
        /// Configured overlap in characters.
        overlap: usize,
        /// Configured window size in characters.
        size: usize,
    },
}

/// Splits text segments into bounded, overlapping windows.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Validate the window parameters and build a chunker.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapExceedsChunkSize {
                overlap: chunk_overlap,
                size: chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Window every segment, preserving segment order and inherited metadata.
    pub fn split(&self, segments: &[TextSegment]) -> Vec<TextChunk> {
        segments
            .iter()
            .flat_map(|segment| {
                split_windows(&segment.content, self.chunk_size, self.chunk_overlap)
                    .into_iter()
                    .map(|content| TextChunk {
                        content,
                        metadata: segment.metadata.clone(),
                        page: segment.page,
                    })
            })
            .collect()
    }
}

/// Produce the character windows for a single piece of text.
///
/// Lengths are measured in characters, not bytes, so multi-byte input never
/// splits inside a code point.
fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    let total = offsets.len();
    if total == 0 {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + size).min(total);
        let byte_start = offsets[start];
        let byte_end = if end == total {
            text.len()
        } else {
            offsets[end]
        };
        windows.push(text[byte_start..byte_end].to_string());
        if end == total {
            break;
        }
        start = end - overlap;
    }
    windows
}

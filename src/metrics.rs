use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    papers_processed: AtomicU64,
    notes_extracted: AtomicU64,
    chunks_indexed: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed pipeline run with its note and chunk counts.
    pub fn record_paper(&self, note_count: u64, chunk_count: u64) {
        self.papers_processed.fetch_add(1, Ordering::Relaxed);
        self.notes_extracted.fetch_add(note_count, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            papers_processed: self.papers_processed.load(Ordering::Relaxed),
            notes_extracted: self.notes_extracted.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of papers fully processed since startup.
    pub papers_processed: u64,
    /// Total notes extracted across all processed papers.
    pub notes_extracted: u64,
    /// Total chunk count upserted across all processed papers.
    pub chunks_indexed: u64,
}

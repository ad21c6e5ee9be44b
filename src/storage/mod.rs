//! Relational and vector persistence for processed papers.

pub mod coordinator;
pub mod documents;
pub mod vectors;

pub use coordinator::{PersistOutcome, PersistenceCoordinator, PersistenceError};
pub use documents::{PAPERS_TABLE, PaperRecord, PaperStore, PaperStoreError, RestPaperStore};
pub use vectors::{QdrantVectorStore, VectorIndex, VectorStoreError, compute_chunk_hash};

//! Source document preparation: retrieval, page pruning, and partitioning.

pub mod fetch;
pub mod pdf;
pub mod partition;

pub use fetch::{FetchError, PdfFetcher};
pub use partition::{PartitionClient, PartitionError};
pub use pdf::{PdfError, prune_pages};

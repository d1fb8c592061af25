//! Chunking, embedding seam, vector store, and hybrid retrieval.

pub mod builder;
pub mod chunk;
pub mod embed;
pub mod retrieve;
pub mod store;
pub mod types;

pub use builder::{BuildError, BuildReport, IndexBuilder};
pub use chunk::{ChunkError, Chunker, ChunkerConfig};
pub use embed::{EmbedError, TextEmbedder};
pub use retrieve::{HybridRetriever, RetrievalConfig, RetrievalResult, RetrieveError};
pub use store::{ScoredChunk, StoreError, VectorStore};
pub use types::{Chunk, ChunkId, Document};

#[cfg(feature = "mock")]
pub use embed::HashEmbedder;

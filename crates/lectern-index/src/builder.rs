use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chunk::Chunker;
use crate::embed::{EmbedError, TextEmbedder, normalize};
use crate::store::{StoreError, VectorStore};
use crate::types::{Chunk, Document};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("embedding stage failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("store stage failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub document_count: usize,
    pub chunk_count: usize,
    pub vector_count: usize,
    pub duration: Duration,
}

/// Orchestrates chunk → embed → store for a full index rebuild.
///
/// The store is only touched once every chunk has a vector, so a failure in
/// any stage leaves the previous index answering queries unchanged.
pub struct IndexBuilder<E> {
    chunker: Chunker,
    embedder: Arc<E>,
}

impl<E: TextEmbedder> IndexBuilder<E> {
    #[must_use]
    pub fn new(chunker: Chunker, embedder: Arc<E>) -> Self {
        Self { chunker, embedder }
    }

    /// # Errors
    ///
    /// Returns `BuildError` if embedding or the store rebuild fails; the
    /// previously persisted index remains authoritative in that case.
    pub async fn build(
        &self,
        documents: &[Document],
        store: &VectorStore,
        embedding_model: &str,
    ) -> Result<BuildReport, BuildError> {
        let started = Instant::now();

        let mut chunks: Vec<Chunk> = Vec::new();
        for document in documents {
            chunks.extend(self.chunker.chunk(document));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };
        for vector in &mut vectors {
            normalize(vector)?;
        }

        let chunk_count = chunks.len();
        let vector_count = vectors.len();
        store.rebuild(chunks, vectors, embedding_model)?;

        let report = BuildReport {
            document_count: documents.len(),
            chunk_count,
            vector_count,
            duration: started.elapsed(),
        };
        tracing::info!(
            documents = report.document_count,
            chunks = report.chunk_count,
            elapsed_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            "index build complete"
        );
        Ok(report)
    }
}

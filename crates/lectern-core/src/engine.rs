use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use lectern_index::chunk::{Chunker, ChunkerConfig};
use lectern_index::embed::TextEmbedder;
use lectern_index::{
    BuildReport, HybridRetriever, IndexBuilder, RetrievalConfig, RetrievalResult, VectorStore,
};
use lectern_llm::CompletionProvider;

use crate::answer::Answer;
use crate::assembler::{AnswerAssembler, AssemblerConfig};
use crate::audit::{AuditRecord, AuditSink};
use crate::config::Config;
use crate::corpus;
use crate::error::EngineError;

/// The facade the API layer talks to: `ask` and `rebuild_index`.
///
/// Queries are read-only against the store and run concurrently; rebuilds
/// serialize against them inside [`VectorStore`]. Every completed query
/// emits exactly one audit record, whatever its terminal state.
pub struct Engine<P, E> {
    store: Arc<VectorStore>,
    retriever: HybridRetriever<E>,
    builder: IndexBuilder<E>,
    assembler: AnswerAssembler<P>,
    audit: Box<dyn AuditSink>,
    corpus_dir: PathBuf,
    embedding_model: String,
}

impl<P: CompletionProvider, E: TextEmbedder> Engine<P, E> {
    /// # Errors
    ///
    /// Returns an error if the chunking window configuration is invalid.
    pub fn new(
        config: &Config,
        provider: Arc<P>,
        embedder: Arc<E>,
        audit: Box<dyn AuditSink>,
    ) -> Result<Self, EngineError> {
        let store = Arc::new(VectorStore::open(&config.index.dir));
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: config.index.chunk_size,
            overlap: config.index.overlap,
        })?;
        let retriever = HybridRetriever::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            RetrievalConfig {
                oversample_factor: config.retrieval.oversample_factor,
                keyword_weight: config.retrieval.keyword_weight,
                require_nonempty: false,
            },
        );
        let builder = IndexBuilder::new(chunker, embedder);
        let assembler = AnswerAssembler::new(
            provider,
            AssemblerConfig {
                top_k: config.retrieval.top_k,
                confidence_threshold: config.answer.confidence_threshold,
                support_threshold: config.answer.support_threshold,
                summarize: config.answer.summarize,
                ..AssemblerConfig::default()
            },
        );

        Ok(Self {
            store,
            retriever,
            builder,
            assembler,
            audit,
            corpus_dir: PathBuf::from(&config.corpus.dir),
            embedding_model: config.llm.embedding_model.clone(),
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Hydrate the store from its persisted artifacts.
    ///
    /// # Errors
    ///
    /// `StoreError::NotBuilt` when nothing has been indexed yet, and
    /// `StoreError::CorruptIndex` when the persisted pair is inconsistent;
    /// both are recoverable via [`Engine::rebuild_index`].
    pub fn load_index(&self) -> Result<(), EngineError> {
        self.store.load(&self.embedding_model)?;
        Ok(())
    }

    /// Answer a query, or clarify, or fail with a typed error.
    ///
    /// # Errors
    ///
    /// Returns an error when embedding or retrieval itself fails; a weak or
    /// empty match is a clarification answer, not an error.
    pub async fn ask(&self, query: &str) -> Result<Answer, EngineError> {
        let started = Instant::now();

        let results = match self
            .retriever
            .retrieve(query, self.assembler.config().top_k)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                self.emit_audit(query, &[], "failed", None, started);
                return Err(e.into());
            }
        };

        let answer = self.assembler.assemble(query, &results).await;
        let outcome = if answer.is_clarification() {
            "clarify"
        } else {
            "answered"
        };
        self.emit_audit(
            query,
            &results,
            outcome,
            Some(answer.verdict.as_str().to_owned()),
            started,
        );
        Ok(answer)
    }

    /// Rebuild the index from the configured corpus directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus scan, embedding, or the store rebuild
    /// fails; the previous index keeps answering queries in that case.
    pub async fn rebuild_index(&self) -> Result<BuildReport, EngineError> {
        let documents = corpus::scan_corpus(&self.corpus_dir)?;
        if documents.is_empty() {
            tracing::warn!(dir = %self.corpus_dir.display(), "corpus is empty");
        }
        let report = self
            .builder
            .build(&documents, &self.store, &self.embedding_model)
            .await?;
        Ok(report)
    }

    fn emit_audit(
        &self,
        query: &str,
        results: &[RetrievalResult],
        outcome: &str,
        verdict: Option<String>,
        started: Instant,
    ) {
        let chunk_ids = results.iter().map(|r| r.id).collect();
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let record = AuditRecord::new(query, chunk_ids, outcome, verdict, latency_ms);
        if let Err(e) = self.audit.append(&record) {
            tracing::warn!("failed to append audit record: {e}");
        }
    }
}

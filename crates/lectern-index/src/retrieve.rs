use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::embed::{EmbedError, TextEmbedder, normalize};
use crate::store::{StoreError, VectorStore};
use crate::types::{Chunk, ChunkId};

/// Query words carrying no lexical signal, skipped by the keyword boost.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "of", "in", "on", "for", "is", "are", "was", "were",
    "be", "this", "that", "it", "with", "as", "by", "at", "from", "about", "who", "what", "when",
    "where", "which",
];

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("query embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("index is empty")]
    EmptyIndex,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Candidates fetched per requested result, to leave room for re-ranking.
    pub oversample_factor: usize,
    /// Scale of the keyword boost; small so it nudges rather than dominates.
    pub keyword_weight: f32,
    /// When set, an empty index fails the request instead of returning
    /// nothing.
    pub require_nonempty: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            oversample_factor: 4,
            keyword_weight: 0.15,
            require_nonempty: false,
        }
    }
}

/// One ranked candidate. Recomputed per query, never persisted.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub id: ChunkId,
    pub chunk: Chunk,
    pub dense_score: f32,
    pub keyword_score: f32,
    pub fused_score: f32,
    pub rank: usize,
}

/// Ranks chunks by dense similarity plus a keyword-overlap boost.
pub struct HybridRetriever<E> {
    store: Arc<VectorStore>,
    embedder: Arc<E>,
    config: RetrievalConfig,
}

impl<E: TextEmbedder> HybridRetriever<E> {
    #[must_use]
    pub fn new(store: Arc<VectorStore>, embedder: Arc<E>, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Top `k` chunks for `query`, fused score descending.
    ///
    /// Ties break on raw dense score, then lower chunk id, so identical
    /// inputs always produce identical orderings. A blank query returns no
    /// results rather than embedding degenerate input.
    ///
    /// # Errors
    ///
    /// Returns `RetrieveError::EmptyIndex` when the index is empty, `k > 0`,
    /// and the config demands results; otherwise fails only on embedding or
    /// store errors.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalResult>, RetrieveError> {
        if self.store.is_empty()? {
            if self.config.require_nonempty && k > 0 {
                return Err(RetrieveError::EmptyIndex);
            }
            return Ok(Vec::new());
        }
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_text = [query.to_owned()];
        let mut query_vector = self.embedder.embed(&query_text).await?.remove(0);
        normalize(&mut query_vector)?;

        let fetch = k.saturating_mul(self.config.oversample_factor).max(k);
        let hits = self.store.search(&query_vector, fetch)?;
        let query_terms = keywords(query);

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(chunk) = self.store.get(hit.id)? else {
                continue;
            };
            let keyword_score = keyword_overlap(&query_terms, &chunk.text);
            let fused_score = self
                .config
                .keyword_weight
                .mul_add(keyword_score, hit.score);
            results.push(RetrievalResult {
                id: hit.id,
                chunk,
                dense_score: hit.score,
                keyword_score,
                fused_score,
                rank: 0,
            });
        }

        results.sort_by(compare);
        results.truncate(k);
        for (rank, result) in results.iter_mut().enumerate() {
            result.rank = rank;
        }

        tracing::debug!(
            candidates = fetch,
            returned = results.len(),
            "hybrid retrieval complete"
        );
        Ok(results)
    }
}

fn compare(a: &RetrievalResult, b: &RetrievalResult) -> Ordering {
    b.fused_score
        .total_cmp(&a.fused_score)
        .then_with(|| b.dense_score.total_cmp(&a.dense_score))
        .then_with(|| a.id.cmp(&b.id))
}

/// Lower-cased alphanumeric terms with stop words removed.
#[must_use]
pub fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Fraction of `terms` present in `text`. Zero when `terms` is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn keyword_overlap(terms: &BTreeSet<String>, text: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let text_terms = keywords(text);
    let present = terms.intersection(&text_terms).count();
    present as f32 / terms.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_drop_stop_words_and_case() {
        let terms = keywords("What is the Sky about?");
        assert!(terms.contains("sky"));
        assert!(!terms.contains("what"));
        assert!(!terms.contains("the"));
        assert!(!terms.contains("is"));
    }

    #[test]
    fn overlap_is_fraction_of_query_terms() {
        let terms = keywords("sky color today");
        let overlap = keyword_overlap(&terms, "the sky is blue today");
        assert!((overlap - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn overlap_with_no_terms_is_zero() {
        let terms = keywords("the is a");
        assert_eq!(keyword_overlap(&terms, "anything at all"), 0.0);
    }

    #[cfg(feature = "mock")]
    mod retrieval {
        use super::*;
        use crate::chunk::{Chunker, ChunkerConfig};
        use crate::embed::HashEmbedder;
        use crate::types::Document;

        async fn build_store(embedder: &HashEmbedder, texts: &[&str]) -> Arc<VectorStore> {
            let dir = tempfile::tempdir().unwrap();
            let store = VectorStore::open(dir.keep());
            let chunker = Chunker::new(ChunkerConfig {
                chunk_size: 50,
                overlap: 5,
            })
            .unwrap();
            let mut chunks = Vec::new();
            for (i, text) in texts.iter().enumerate() {
                chunks.extend(chunker.chunk(&Document::new(format!("doc{i}.txt"), *text)));
            }
            let contents: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&contents).await.unwrap();
            store.add(chunks, vectors).unwrap();
            Arc::new(store)
        }

        fn retriever(
            store: Arc<VectorStore>,
            embedder: Arc<HashEmbedder>,
            config: RetrievalConfig,
        ) -> HybridRetriever<HashEmbedder> {
            HybridRetriever::new(store, embedder, config)
        }

        #[tokio::test]
        async fn returns_at_most_k_ranked_results() {
            let embedder = Arc::new(HashEmbedder::new(64));
            let store = build_store(
                &embedder,
                &[
                    "the sky is blue and wide",
                    "grass is green in spring",
                    "rivers run to the sea",
                    "mountains are tall and cold",
                ],
            )
            .await;
            let r = retriever(store, embedder, RetrievalConfig::default());

            let results = r.retrieve("how blue is the sky", 2).await.unwrap();
            assert!(results.len() <= 2);
            for pair in results.windows(2) {
                assert!(pair[0].fused_score >= pair[1].fused_score);
            }
            for (rank, result) in results.iter().enumerate() {
                assert_eq!(result.rank, rank);
            }
        }

        #[tokio::test]
        async fn keyword_boost_shifts_ranking() {
            let embedder = Arc::new(HashEmbedder::new(64));
            let store = build_store(
                &embedder,
                &["sky blue weather report", "sky grass rivers mixed text"],
            )
            .await;
            let r = retriever(
                store,
                embedder,
                RetrievalConfig {
                    keyword_weight: 0.15,
                    ..RetrievalConfig::default()
                },
            );

            let results = r.retrieve("sky blue weather", 2).await.unwrap();
            assert_eq!(results[0].chunk.source, "doc0.txt");
            assert!(results[0].keyword_score > results[1].keyword_score);
        }

        #[tokio::test]
        async fn fused_score_uses_configured_weight() {
            let embedder = Arc::new(HashEmbedder::new(64));
            let store = build_store(&embedder, &["sky blue report"]).await;
            let weight = 0.25;
            let r = retriever(
                store,
                embedder,
                RetrievalConfig {
                    keyword_weight: weight,
                    ..RetrievalConfig::default()
                },
            );

            let results = r.retrieve("sky blue", 1).await.unwrap();
            let expected = weight.mul_add(results[0].keyword_score, results[0].dense_score);
            assert!((results[0].fused_score - expected).abs() < 1e-6);
        }

        #[tokio::test]
        async fn ranking_is_stable_across_calls() {
            let embedder = Arc::new(HashEmbedder::new(64));
            let store = build_store(
                &embedder,
                &[
                    "first passage about storage engines",
                    "second passage about storage engines",
                    "third passage about storage engines",
                ],
            )
            .await;
            let r = retriever(store, embedder, RetrievalConfig::default());

            let first: Vec<ChunkId> = r
                .retrieve("storage engines", 3)
                .await
                .unwrap()
                .iter()
                .map(|x| x.id)
                .collect();
            for _ in 0..5 {
                let again: Vec<ChunkId> = r
                    .retrieve("storage engines", 3)
                    .await
                    .unwrap()
                    .iter()
                    .map(|x| x.id)
                    .collect();
                assert_eq!(again, first);
            }
        }

        #[tokio::test]
        async fn empty_index_returns_nothing_by_default() {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(VectorStore::open(dir.path()));
            let embedder = Arc::new(HashEmbedder::new(64));
            let r = retriever(store, embedder, RetrievalConfig::default());

            assert!(r.retrieve("anything", 3).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn empty_index_fails_when_results_required() {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(VectorStore::open(dir.path()));
            let embedder = Arc::new(HashEmbedder::new(64));
            let r = retriever(
                store,
                embedder,
                RetrievalConfig {
                    require_nonempty: true,
                    ..RetrievalConfig::default()
                },
            );

            assert!(matches!(
                r.retrieve("anything", 3).await,
                Err(RetrieveError::EmptyIndex)
            ));
        }

        #[tokio::test]
        async fn blank_query_returns_nothing() {
            let embedder = Arc::new(HashEmbedder::new(64));
            let store = build_store(&embedder, &["some indexed text"]).await;
            let r = retriever(store, embedder, RetrievalConfig::default());

            assert!(r.retrieve("   ", 3).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn stop_word_only_query_degrades_to_dense() {
            let embedder = Arc::new(HashEmbedder::new(64));
            let store = build_store(&embedder, &["it is what it is", "on and on"]).await;
            let r = retriever(store, embedder, RetrievalConfig::default());

            let results = r.retrieve("what is this about", 2).await.unwrap();
            for result in &results {
                assert_eq!(result.keyword_score, 0.0);
                assert!((result.fused_score - result.dense_score).abs() < 1e-6);
            }
        }
    }
}

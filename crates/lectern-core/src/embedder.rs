use std::sync::Arc;

use lectern_index::embed::{EmbedError, TextEmbedder, normalize};
use lectern_llm::CompletionProvider;

/// Adapts a completion provider's embedding endpoint to the index's
/// [`TextEmbedder`] seam.
///
/// The output dimension is discovered once with a probe embedding and then
/// fixed for the adapter's lifetime, matching the index contract that the
/// encoder's dimensionality is constant.
pub struct ProviderEmbedder<P> {
    provider: Arc<P>,
    dim: usize,
}

impl<P: CompletionProvider> ProviderEmbedder<P> {
    /// # Errors
    ///
    /// Returns an error if the provider cannot embed or the probe call fails.
    pub async fn probe(provider: Arc<P>) -> Result<Self, EmbedError> {
        if !provider.supports_embeddings() {
            return Err(EmbedError::Backend(format!(
                "provider '{}' does not support embeddings",
                provider.name()
            )));
        }
        let vector = provider
            .embed("dimension probe")
            .await
            .map_err(|e| EmbedError::Backend(e.to_string()))?;
        if vector.is_empty() {
            return Err(EmbedError::Backend(format!(
                "provider '{}' returned an empty probe vector",
                provider.name()
            )));
        }
        Ok(Self {
            provider,
            dim: vector.len(),
        })
    }
}

impl<P: CompletionProvider> TextEmbedder for ProviderEmbedder<P> {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let mut vector = self
                .provider
                .embed(text)
                .await
                .map_err(|e| EmbedError::Backend(e.to_string()))?;
            if vector.len() != self.dim {
                return Err(EmbedError::Backend(format!(
                    "provider returned dim {}, probe saw {}",
                    vector.len(),
                    self.dim
                )));
            }
            normalize(&mut vector)?;
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_llm::mock::MockProvider;

    #[tokio::test]
    async fn probe_fixes_dimension() {
        let provider = Arc::new(MockProvider::default().with_embeddings(vec![3.0, 4.0, 0.0]));
        let embedder = ProviderEmbedder::probe(provider).await.unwrap();
        assert_eq!(embedder.dimension(), 3);
    }

    #[tokio::test]
    async fn embed_normalizes_backend_output() {
        let provider = Arc::new(MockProvider::default().with_embeddings(vec![3.0, 4.0]));
        let embedder = ProviderEmbedder::probe(provider).await.unwrap();
        let vectors = embedder.embed(&["text".to_owned()]).await.unwrap();
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn probe_rejects_non_embedding_provider() {
        let provider = Arc::new(MockProvider::default());
        assert!(ProviderEmbedder::probe(provider).await.is_err());
    }

    #[tokio::test]
    async fn zero_vector_from_backend_is_degenerate() {
        let provider = Arc::new(MockProvider::default().with_embeddings(vec![0.0, 0.0]));
        let embedder = ProviderEmbedder::probe(provider).await.unwrap();
        let result = embedder.embed(&["text".to_owned()]).await;
        assert!(matches!(result, Err(EmbedError::Degenerate)));
    }
}

use std::future::Future;

/// Tolerance for the unit-norm invariant on stored and query vectors.
pub const NORM_TOLERANCE: f32 = 1e-5;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("degenerate input: embedding norm is numerically zero")]
    Degenerate,

    #[error("embedding backend failed: {0}")]
    Backend(String),
}

/// Maps texts to fixed-dimension dense vectors.
///
/// `dimension` must be constant for the lifetime of an index, and the same
/// text must always produce the same vector. Backends are not required to
/// return unit vectors; the pipeline normalizes via [`normalize`] before
/// anything is stored or compared.
pub trait TextEmbedder: Send + Sync {
    fn dimension(&self) -> usize;

    /// # Errors
    ///
    /// Returns an error if the backend fails or an input is degenerate.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbedError>> + Send;
}

/// Scale a vector to unit L2 norm in place.
///
/// # Errors
///
/// Returns `EmbedError::Degenerate` when the norm is numerically zero.
pub fn normalize(vector: &mut [f32]) -> Result<(), EmbedError> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return Err(EmbedError::Degenerate);
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    Ok(())
}

/// Deterministic bag-of-tokens embedder for tests and offline runs.
///
/// Each lower-cased alphanumeric token is hashed into one of `dim` slots
/// with a sign bit, then the vector is normalized. Texts sharing tokens get
/// correlated vectors, which is enough structure for ranking tests.
#[cfg(feature = "mock")]
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

#[cfg(feature = "mock")]
impl HashEmbedder {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = blake3::hash(token.to_lowercase().as_bytes());
            let bytes: [u8; 8] = hash.as_bytes()[..8]
                .try_into()
                .unwrap_or([0; 8]);
            let word = u64::from_le_bytes(bytes);
            let slot = usize::try_from(word % self.dim as u64).unwrap_or(0);
            vector[slot] += if word & (1 << 8) == 0 { 1.0 } else { -1.0 };
        }
        normalize(&mut vector)?;
        Ok(vector)
    }
}

#[cfg(feature = "mock")]
impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(feature = "mock")]
impl TextEmbedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_yields_unit_norm() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v).unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < NORM_TOLERANCE);
    }

    #[test]
    fn normalize_rejects_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        assert!(matches!(normalize(&mut v), Err(EmbedError::Degenerate)));
    }

    #[cfg(feature = "mock")]
    mod hash_embedder {
        use super::*;

        #[tokio::test]
        async fn same_text_same_vector() {
            let embedder = HashEmbedder::new(32);
            let texts = vec!["the sky is blue".to_owned()];
            let a = embedder.embed(&texts).await.unwrap();
            let b = embedder.embed(&texts).await.unwrap();
            assert_eq!(a, b);
        }

        #[tokio::test]
        async fn output_is_unit_norm() {
            let embedder = HashEmbedder::new(32);
            let vectors = embedder
                .embed(&["some words to hash".to_owned()])
                .await
                .unwrap();
            let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < NORM_TOLERANCE);
        }

        #[tokio::test]
        async fn empty_text_is_degenerate() {
            let embedder = HashEmbedder::new(32);
            let result = embedder.embed(&[String::new()]).await;
            assert!(matches!(result, Err(EmbedError::Degenerate)));
        }

        #[tokio::test]
        async fn shared_tokens_raise_similarity() {
            let embedder = HashEmbedder::new(64);
            let vectors = embedder
                .embed(&[
                    "the sky is blue today".to_owned(),
                    "what color is the sky".to_owned(),
                    "tax law for partnerships".to_owned(),
                ])
                .await
                .unwrap();
            let dot = |a: &[f32], b: &[f32]| -> f32 {
                a.iter().zip(b).map(|(x, y)| x * y).sum()
            };
            assert!(dot(&vectors[0], &vectors[1]) > dot(&vectors[0], &vectors[2]));
        }

        #[tokio::test]
        async fn dimension_is_fixed() {
            let embedder = HashEmbedder::new(16);
            assert_eq!(embedder.dimension(), 16);
            let vectors = embedder.embed(&["a b c".to_owned()]).await.unwrap();
            assert_eq!(vectors[0].len(), 16);
        }
    }
}

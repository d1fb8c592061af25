use crate::error::LlmError;

/// A text-completion service reached over a local network call.
///
/// The answer path treats this as a black box: one prompt in, one completion
/// out, bounded by the backend's request timeout. Embedding support is
/// optional and gated by [`CompletionProvider::supports_embeddings`].
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt` and return the generated text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable, times out, or
    /// produces an invalid response.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Embed a single text into a dense vector.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::EmbedUnsupported` if this provider cannot embed.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    fn supports_embeddings(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

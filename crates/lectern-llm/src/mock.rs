//! Test-only mock completion provider.

use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::CompletionProvider;

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    pub supports_embeddings: bool,
    pub fail_complete: bool,
    pub fail_embed: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock completion".into(),
            embedding: vec![0.1; 8],
            supports_embeddings: false,
            fail_complete: false,
            fail_embed: false,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    /// Simulates an unreachable summarization service.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            fail_complete: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embeddings(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self.supports_embeddings = true;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Number of canned responses not yet consumed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl CompletionProvider for MockProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail_complete {
            return Err(LlmError::Unavailable("mock provider down".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        if self.fail_embed {
            return Err(LlmError::Unavailable("mock embed down".into()));
        }
        if self.supports_embeddings {
            Ok(self.embedding.clone())
        } else {
            Err(LlmError::EmbedUnsupported { provider: "mock" })
        }
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

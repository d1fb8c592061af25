use std::time::Duration;

use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::LlmError;
use crate::provider::CompletionProvider;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Local Ollama backend for completion and embeddings.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
    request_timeout: Duration,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            embedding_model,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound every request by `timeout`; exceeding it yields
    /// `LlmError::Timeout`, which the answer path recovers from.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Check if Ollama is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection to Ollama fails.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        self.client.list_local_models().await.map_err(|e| {
            LlmError::Unavailable(format!("failed to connect to Ollama — is it running? {e}"))
        })?;
        Ok(())
    }

    async fn bounded<T, F>(&self, future: F) -> Result<T, LlmError>
    where
        F: Future<Output = Result<T, ollama_rs::error::OllamaError>>,
    {
        tokio::time::timeout(self.request_timeout, future)
            .await
            .map_err(|_| LlmError::Timeout(self.request_timeout))?
            .map_err(|e| LlmError::Unavailable(e.to_string()))
    }
}

impl CompletionProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatMessageRequest::new(
            self.model.clone(),
            vec![ChatMessage::user(prompt.to_owned())],
        );
        let response = self.bounded(self.client.send_chat_messages(request)).await?;

        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: "ollama" });
        }
        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::from(text),
        );
        let response = self.bounded(self.client.generate_embeddings(request)).await?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse { provider: "ollama" })
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: &'static str },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Whether the answer path should degrade to an extractive fallback
    /// rather than failing the request.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Unavailable(_) | Self::EmptyResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_unavailable_are_recoverable() {
        assert!(LlmError::Timeout(Duration::from_secs(5)).is_recoverable());
        assert!(LlmError::Unavailable("connection refused".into()).is_recoverable());
        assert!(
            LlmError::EmptyResponse {
                provider: "ollama"
            }
            .is_recoverable()
        );
    }

    #[test]
    fn other_is_not_recoverable() {
        assert!(!LlmError::Other("bad request".into()).is_recoverable());
    }
}

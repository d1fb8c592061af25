use lectern_index::{BuildError, ChunkError, RetrieveError, StoreError};

use crate::corpus::CorpusError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures surfaced to the caller of `ask` / `rebuild_index`.
///
/// These are hard failures, rendered distinctly from a clarification: a
/// `Clarify` answer means "ask a better question", an `EngineError` means
/// "the system could not process this one".
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("retrieval failed: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("index build failed: {0}")]
    Build(#[from] BuildError),

    #[error("index store failed: {0}")]
    Store(#[from] StoreError),

    #[error("corpus scan failed: {0}")]
    Corpus(#[from] CorpusError),

    #[error("invalid chunking configuration: {0}")]
    Chunk(#[from] ChunkError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_error_converts() {
        let err: EngineError = RetrieveError::EmptyIndex.into();
        assert!(matches!(err, EngineError::Retrieve(_)));
        assert!(err.to_string().contains("retrieval failed"));
    }

    #[test]
    fn chunk_error_converts() {
        let err: EngineError = ChunkError::InvalidWindow {
            chunk_size: 5,
            overlap: 5,
        }
        .into();
        assert!(err.to_string().contains("chunking configuration"));
    }
}

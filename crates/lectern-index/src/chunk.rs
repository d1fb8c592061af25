use crate::types::{Chunk, Document};

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidWindow { chunk_size: usize, overlap: usize },
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

/// Splits document text into overlapping fixed-size token windows.
///
/// A token is a maximal run of non-whitespace characters. Windows advance
/// by `chunk_size - overlap` tokens; the final window may be shorter and is
/// always emitted. Boundaries are a pure function of the input text, so
/// re-chunking identical text yields identical chunks.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// # Errors
    ///
    /// Returns `ChunkError::InvalidWindow` unless `0 <= overlap < chunk_size`.
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkError> {
        if config.chunk_size == 0 || config.overlap >= config.chunk_size {
            return Err(ChunkError::InvalidWindow {
                chunk_size: config.chunk_size,
                overlap: config.overlap,
            });
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Empty or whitespace-only text yields no chunks.
    #[must_use]
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let spans = token_spans(&document.text);
        if spans.is_empty() {
            return Vec::new();
        }

        let step = self.config.chunk_size - self.config.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        while start < spans.len() {
            let end = (start + self.config.chunk_size).min(spans.len());
            let (byte_start, _) = spans[start];
            let (_, byte_end) = spans[end - 1];

            chunks.push(Chunk {
                source: document.source.clone(),
                index,
                start_token: start,
                end_token: end,
                text: document.text[byte_start..byte_end].to_owned(),
                token_count: end - start,
            });

            if end == spans.len() {
                break;
            }
            start += step;
            index += 1;
        }

        chunks
    }
}

/// Byte spans of maximal non-whitespace runs, in order.
fn token_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;

    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }

    spans
}

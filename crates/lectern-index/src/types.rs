use serde::{Deserialize, Serialize};

/// Stable row index into the vector table and the manifest.
///
/// Assigned by [`crate::VectorStore`] in insertion order; a rebuild
/// renumbers every chunk from zero.
pub type ChunkId = usize;

/// A source document as handed over by the ingest layer.
///
/// Immutable once chunked. `content_hash` identifies the exact text that
/// was indexed, so unchanged documents can be recognized across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
    pub content_hash: String,
}

impl Document {
    #[must_use]
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let content_hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        Self {
            source: source.into(),
            text,
            content_hash,
        }
    }
}

/// A bounded window of a document's text, the unit of retrieval.
///
/// `start_token..end_token` are offsets into the parent document's token
/// sequence; `text` is the exact source slice spanning those tokens, so
/// citations always quote the original verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub index: usize,
    pub start_token: usize,
    pub end_token: usize,
    pub text: String,
    pub token_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable() {
        let a = Document::new("a.txt", "same text");
        let b = Document::new("b.txt", "same text");
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn content_hash_differs_for_different_text() {
        let a = Document::new("a.txt", "one");
        let b = Document::new("a.txt", "two");
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn chunk_roundtrips_through_json() {
        let chunk = Chunk {
            source: "doc.txt".into(),
            index: 2,
            start_token: 10,
            end_token: 15,
            text: "five tokens of text here".into(),
            token_count: 5,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}

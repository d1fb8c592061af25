use serde::{Deserialize, Serialize};

use lectern_index::RetrievalResult;

/// Outcome of the citation-support audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportVerdict {
    /// Every answer sentence clears the support threshold.
    Supported,
    /// Some sentences clear it, some do not.
    PartiallySupported,
    /// No sentence clears it. The answer is still returned; callers should
    /// warn the end user.
    Unsupported,
}

impl SupportVerdict {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supported => "supported",
            Self::PartiallySupported => "partially-supported",
            Self::Unsupported => "unsupported",
        }
    }
}

/// A passage backing the answer, quoted verbatim from the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub chunk_id: usize,
    pub source: String,
    pub snippet: String,
    pub dense_score: f32,
    pub fused_score: f32,
}

/// The terminal result of one query.
///
/// When `clarification` is set the system declined to answer; `text` then
/// carries the human-readable refusal and `citations` any weak suggestions.
/// Hard failures never take this form; they surface as typed errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
    pub verdict: SupportVerdict,
    pub clarification: Option<String>,
}

impl Answer {
    #[must_use]
    pub fn is_clarification(&self) -> bool {
        self.clarification.is_some()
    }
}

/// Shorten text to a display snippet on a char boundary.
#[must_use]
pub fn snippet(text: &str, max_chars: usize) -> String {
    let cleaned = text.trim().replace('\n', " ");
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }
    let mut out: String = cleaned.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub(crate) fn citation_from(result: &RetrievalResult, snippet_chars: usize) -> Citation {
    Citation {
        chunk_id: result.id,
        source: result.chunk.source.clone(),
        snippet: snippet(&result.chunk.text, snippet_chars),
        dense_score: result.dense_score,
        fused_score: result.fused_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_strings_are_kebab_case() {
        assert_eq!(SupportVerdict::Supported.as_str(), "supported");
        assert_eq!(
            SupportVerdict::PartiallySupported.as_str(),
            "partially-supported"
        );
        let json = serde_json::to_string(&SupportVerdict::PartiallySupported).unwrap();
        assert_eq!(json, "\"partially-supported\"");
    }

    #[test]
    fn snippet_keeps_short_text() {
        assert_eq!(snippet("short text", 320), "short text");
    }

    #[test]
    fn snippet_truncates_long_text_with_ellipsis() {
        let long = "x".repeat(500);
        let s = snippet(&long, 320);
        assert_eq!(s.chars().count(), 323);
        assert!(s.ends_with("..."));
    }

    #[test]
    fn snippet_flattens_newlines() {
        assert_eq!(snippet("line one\nline two", 320), "line one line two");
    }

    #[test]
    fn snippet_respects_multibyte_boundaries() {
        let text = "é".repeat(10);
        let s = snippet(&text, 4);
        assert!(s.starts_with("éééé"));
    }
}

use std::fmt::Write;
use std::sync::Arc;

use lectern_index::RetrievalResult;
use lectern_index::retrieve::{keyword_overlap, keywords};
use lectern_llm::CompletionProvider;

use crate::answer::{Answer, SupportVerdict, citation_from, snippet};

const NO_CONTEXT_TEXT: &str = "No relevant passages found in the indexed documents.";
const NO_CONTEXT_CLARIFICATION: &str =
    "No matching documents. Try different keywords or index more material.";
const LOW_CONFIDENCE_TEXT: &str =
    "The indexed documents only weakly match this question; no reliable answer found.";
const LOW_CONFIDENCE_CLARIFICATION: &str =
    "The question matches the documents only weakly. Rephrase it or narrow its scope.";

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Chunks cited per answer.
    pub top_k: usize,
    /// Minimum top fused score before answering instead of clarifying.
    pub confidence_threshold: f32,
    /// Minimum per-sentence keyword overlap for a sentence to count as
    /// supported by its citations.
    pub support_threshold: f32,
    /// When false, skip the completion service and answer extractively.
    pub summarize: bool,
    /// Display length of citation snippets and extractive answers.
    pub snippet_chars: usize,
    /// Per-chunk text budget in the summarization prompt.
    pub context_chars: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            confidence_threshold: 0.18,
            support_threshold: 0.4,
            summarize: true,
            snippet_chars: 320,
            context_chars: 400,
        }
    }
}

/// Turns retrieved chunks into the terminal [`Answer`] for a query.
///
/// Runs strictly after retrieval has released every index lock; the only
/// blocking call here is the bounded completion request, and its failure
/// degrades to an extractive answer rather than failing the query.
pub struct AnswerAssembler<P> {
    provider: Arc<P>,
    config: AssemblerConfig,
}

impl<P: CompletionProvider> AnswerAssembler<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: AssemblerConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub async fn assemble(&self, query: &str, results: &[RetrievalResult]) -> Answer {
        if results.is_empty() {
            return Answer {
                text: NO_CONTEXT_TEXT.to_owned(),
                citations: Vec::new(),
                verdict: SupportVerdict::Unsupported,
                clarification: Some(NO_CONTEXT_CLARIFICATION.to_owned()),
            };
        }

        let citations = results
            .iter()
            .map(|r| citation_from(r, self.config.snippet_chars))
            .collect();

        if results[0].fused_score < self.config.confidence_threshold {
            return Answer {
                text: LOW_CONFIDENCE_TEXT.to_owned(),
                citations,
                verdict: SupportVerdict::Unsupported,
                clarification: Some(LOW_CONFIDENCE_CLARIFICATION.to_owned()),
            };
        }

        let text = if self.config.summarize {
            let prompt = build_prompt(query, results, self.config.context_chars);
            match self.provider.complete(&prompt).await {
                Ok(text) => text,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        provider = self.provider.name(),
                        "summarization unavailable, falling back to extractive answer: {e}"
                    );
                    extractive_answer(results, self.config.snippet_chars)
                }
                Err(e) => {
                    tracing::error!(
                        provider = self.provider.name(),
                        "summarization failed, falling back to extractive answer: {e}"
                    );
                    extractive_answer(results, self.config.snippet_chars)
                }
            }
        } else {
            extractive_answer(results, self.config.snippet_chars)
        };

        let verdict = audit_support(&text, results, self.config.support_threshold);
        Answer {
            text,
            citations,
            verdict,
            clarification: None,
        }
    }
}

/// Prompt with each chunk tagged by its citation marker.
fn build_prompt(query: &str, results: &[RetrievalResult], context_chars: usize) -> String {
    let mut prompt = String::from(
        "Answer the question using only the passages below. \
         Cite passages by their [n] marker. If the passages do not contain \
         the answer, say exactly: 'I cannot find it in the documents.'\n\nPassages:\n",
    );
    for (n, result) in results.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "[{}] ({}) {}",
            n + 1,
            result.chunk.source,
            snippet(&result.chunk.text, context_chars),
        );
    }
    let _ = write!(prompt, "\nQuestion: {query}\nAnswer:");
    prompt
}

/// Answer built directly from the top chunk when summarization is off or
/// unavailable.
fn extractive_answer(results: &[RetrievalResult], snippet_chars: usize) -> String {
    let top = &results[0];
    format!(
        "Based on the document '{}': {}",
        top.chunk.source,
        snippet(&top.chunk.text, snippet_chars)
    )
}

/// Sentence boundaries for the audit: `.`, `?` or `!` followed by
/// whitespace or end of text. Unterminated text is a single sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let boundary = matches!(ch, '.' | '?' | '!')
            && chars.peek().is_none_or(|next| next.is_whitespace());
        if boundary && !current.trim().is_empty() {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }

    sentences
}

/// Classify the answer against its cited chunks with the same keyword
/// overlap measure retrieval uses.
fn audit_support(
    answer_text: &str,
    results: &[RetrievalResult],
    support_threshold: f32,
) -> SupportVerdict {
    let sentences = split_sentences(answer_text);
    let sentences = if sentences.is_empty() {
        vec![answer_text.to_owned()]
    } else {
        sentences
    };

    let mut supported = 0usize;
    let mut scored = 0usize;
    for sentence in &sentences {
        let terms = keywords(sentence);
        if terms.is_empty() {
            continue;
        }
        scored += 1;
        let best = results
            .iter()
            .map(|r| keyword_overlap(&terms, &r.chunk.text))
            .fold(0.0f32, f32::max);
        if best >= support_threshold {
            supported += 1;
        }
    }

    if scored == 0 || supported == scored {
        SupportVerdict::Supported
    } else if supported > 0 {
        SupportVerdict::PartiallySupported
    } else {
        SupportVerdict::Unsupported
    }
}

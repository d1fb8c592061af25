use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub answer: AnswerConfig,
    pub llm: LlmConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub dir: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dir: String,
    pub chunk_size: usize,
    pub overlap: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub oversample_factor: usize,
    pub keyword_weight: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    pub confidence_threshold: f32,
    pub support_threshold: f32,
    pub summarize: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: String,
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LECTERN_CORPUS_DIR") {
            self.corpus.dir = v;
        }
        if let Ok(v) = std::env::var("LECTERN_INDEX_DIR") {
            self.index.dir = v;
        }
        if let Ok(v) = std::env::var("LECTERN_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("LECTERN_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LECTERN_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("LECTERN_AUDIT_PATH") {
            self.audit.path = v;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            answer: AnswerConfig::default(),
            llm: LlmConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: "./corpus".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: "./data/index".into(),
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            oversample_factor: 4,
            keyword_weight: 0.15,
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.18,
            support_threshold: 0.4,
            summarize: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "phi3:latest".into(),
            embedding_model: "nomic-embed-text".into(),
            timeout_secs: 60,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: "./logs/audit.jsonl".into(),
        }
    }
}

//! Answer assembly with citation auditing, and the ask/rebuild engine.

pub mod answer;
pub mod assembler;
pub mod audit;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod engine;
pub mod error;

pub use answer::{Answer, Citation, SupportVerdict};
pub use assembler::{AnswerAssembler, AssemblerConfig};
pub use audit::{AuditRecord, AuditSink, JsonlAuditSink, MemoryAuditSink};
pub use config::Config;
pub use embedder::ProviderEmbedder;
pub use engine::Engine;
pub use error::EngineError;

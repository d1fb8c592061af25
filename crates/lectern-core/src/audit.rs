use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audit sink lock poisoned")]
    Poisoned,
}

/// One record per completed query, in any terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub ts: String,
    pub query: String,
    pub chunk_ids: Vec<usize>,
    pub outcome: String,
    pub verdict: Option<String>,
    pub latency_ms: u64,
}

impl AuditRecord {
    #[must_use]
    pub fn new(
        query: &str,
        chunk_ids: Vec<usize>,
        outcome: &str,
        verdict: Option<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
            query: query.to_owned(),
            chunk_ids,
            outcome: outcome.to_owned(),
            verdict,
            latency_ms,
        }
    }
}

/// Append-only structured log sink.
pub trait AuditSink: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the record cannot be appended.
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Appends one JSON object per line to a log file.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Collects records in memory; used by tests to assert emission.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn records(&self) -> Result<Vec<AuditRecord>, AuditError> {
        self.records
            .lock()
            .map(|r| r.clone())
            .map_err(|_| AuditError::Poisoned)
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .map_err(|_| AuditError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(query: &str) -> AuditRecord {
        AuditRecord::new(query, vec![0, 2], "answered", Some("supported".into()), 12)
    }

    #[test]
    fn jsonl_sink_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/audit.jsonl");
        let sink = JsonlAuditSink::new(&path);

        sink.append(&record("first")).unwrap();
        sink.append(&record("second")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.query, "first");
        assert_eq!(parsed.chunk_ids, vec![0, 2]);
    }

    #[test]
    fn memory_sink_collects_records() {
        let sink = MemoryAuditSink::new();
        sink.append(&record("q")).unwrap();
        let records = sink.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "answered");
    }

    #[test]
    fn record_ids_are_unique() {
        let a = record("q");
        let b = record("q");
        assert_ne!(a.id, b.id);
    }
}

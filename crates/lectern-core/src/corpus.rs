use std::path::{Path, PathBuf};

use lectern_index::Document;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("corpus directory not found: {0}")]
    Missing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Scan a directory of plain-text documents into [`Document`] values.
///
/// Files are processed in name order so rebuilds over an unchanged corpus
/// see the documents in the same sequence. Anything with an unsupported
/// extension is skipped; decoding beyond UTF-8 is the ingest layer's job,
/// so invalid bytes are replaced rather than detected.
///
/// # Errors
///
/// Returns an error if the directory is missing or a file cannot be read.
pub fn scan_corpus(dir: &Path) -> Result<Vec<Document>, CorpusError> {
    if !dir.is_dir() {
        return Err(CorpusError::Missing(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext) {
            tracing::debug!(path = %path.display(), "skipping unsupported file");
            continue;
        }

        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        documents.push(Document::new(source, text));
    }

    tracing::info!(count = documents.len(), dir = %dir.display(), "corpus scanned");
    Ok(documents)
}

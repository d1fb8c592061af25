use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::{Chunk, ChunkId};

/// Bumped whenever the persisted artifact layout changes.
pub const MANIFEST_VERSION: u32 = 1;

const VECTORS_FILE: &str = "vectors.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index not built yet under {0}")]
    NotBuilt(PathBuf),

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("length mismatch: {chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("store lock poisoned")]
    Poisoned,
}

/// One search hit: manifest row id plus inner-product score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: ChunkId,
    pub score: f32,
}

#[derive(Debug, Default)]
struct Inner {
    dim: usize,
    embedding_model: String,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
}

#[derive(Serialize, Deserialize)]
struct VectorsArtifact {
    dim: usize,
    rows: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct ManifestArtifact {
    version: u32,
    embedding_model: String,
    dim: usize,
    chunks: Vec<Chunk>,
}

/// Owns the vector table and its manifest behind one reader/writer lock.
///
/// Row `i` of the vector table corresponds to manifest record `i`; both are
/// only ever mutated together under the write lock, so readers observe a
/// complete pair. Persistence is two JSON artifacts under one directory,
/// each published via a temp-file rename.
pub struct VectorStore {
    dir: PathBuf,
    inner: RwLock<Inner>,
    /// Serializes `add`/`rebuild`/`save` against each other, so a rebuild's
    /// persist-then-swap sequence can never interleave with another writer.
    writer: Mutex<()>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Open a store over `dir` with empty in-memory state. Call
    /// [`VectorStore::load`] to hydrate from persisted artifacts.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            inner: RwLock::new(Inner::default()),
            writer: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.chunks.len())
    }

    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Clone of the manifest record for `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn get(&self, id: ChunkId) -> Result<Option<Chunk>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.chunks.get(id).cloned())
    }

    /// Append chunks and their vectors. Ids continue from the current row
    /// count. Does not persist; call [`VectorStore::save`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error on length or dimension mismatch.
    pub fn add(&self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<(), StoreError> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let dim = if inner.dim == 0 {
            vectors[0].len()
        } else {
            inner.dim
        };
        for vector in &vectors {
            if vector.len() != dim {
                return Err(StoreError::DimensionMismatch {
                    expected: dim,
                    got: vector.len(),
                });
            }
        }

        inner.dim = dim;
        inner.vectors.extend(vectors);
        inner.chunks.extend(chunks);
        tracing::debug!(rows = inner.chunks.len(), "store append complete");
        Ok(())
    }

    /// Inner-product search over the current index, best first.
    ///
    /// Returns at most `k` hits; every returned id has a manifest row.
    ///
    /// # Errors
    ///
    /// Returns an error on dimension mismatch or a poisoned lock.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        if k == 0 || inner.vectors.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != inner.dim {
            return Err(StoreError::DimensionMismatch {
                expected: inner.dim,
                got: query.len(),
            });
        }

        let mut scored: Vec<ScoredChunk> = inner
            .vectors
            .iter()
            .enumerate()
            .map(|(id, row)| ScoredChunk {
                id,
                score: dot(query, row),
            })
            .collect();

        scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Replace the entire contents with a freshly built pair.
    ///
    /// The replacement is validated and persisted before the in-memory swap,
    /// so a failure at any point leaves both the previous in-memory index and
    /// the previous artifacts untouched. In-flight searches see either the
    /// old pair or the new pair, never a mixture.
    ///
    /// # Errors
    ///
    /// Returns an error on length/dimension mismatch or persistence failure.
    pub fn rebuild(
        &self,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        embedding_model: &str,
    ) -> Result<(), StoreError> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        let dim = vectors.first().map_or(0, Vec::len);
        for vector in &vectors {
            if vector.len() != dim {
                return Err(StoreError::DimensionMismatch {
                    expected: dim,
                    got: vector.len(),
                });
            }
        }

        let fresh = Inner {
            dim,
            embedding_model: embedding_model.to_owned(),
            vectors,
            chunks,
        };

        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        persist(&self.dir, &fresh)?;

        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let rows = fresh.chunks.len();
        *inner = fresh;
        drop(inner);
        tracing::info!(rows, dim, "index rebuilt and swapped in");
        Ok(())
    }

    /// Persist the current in-memory pair.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the artifact writes fail.
    pub fn save(&self) -> Result<(), StoreError> {
        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        persist(&self.dir, &inner)
    }

    /// Load the persisted pair, verifying mutual consistency.
    ///
    /// # Errors
    ///
    /// `StoreError::NotBuilt` when neither artifact exists;
    /// `StoreError::CorruptIndex` when only one exists, the format version is
    /// unsupported, row counts or dimensions disagree, or the persisted
    /// embedding model differs from `expected_model`.
    pub fn load(&self, expected_model: &str) -> Result<(), StoreError> {
        let vectors_path = self.dir.join(VECTORS_FILE);
        let manifest_path = self.dir.join(MANIFEST_FILE);

        match (vectors_path.exists(), manifest_path.exists()) {
            (false, false) => return Err(StoreError::NotBuilt(self.dir.clone())),
            (true, true) => {}
            (true, false) => {
                return Err(StoreError::CorruptIndex(format!(
                    "manifest artifact missing: {}",
                    manifest_path.display()
                )));
            }
            (false, true) => {
                return Err(StoreError::CorruptIndex(format!(
                    "vectors artifact missing: {}",
                    vectors_path.display()
                )));
            }
        }

        let vectors: VectorsArtifact = serde_json::from_str(&fs::read_to_string(&vectors_path)?)?;
        let manifest: ManifestArtifact =
            serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;

        if manifest.version != MANIFEST_VERSION {
            return Err(StoreError::CorruptIndex(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        if manifest.embedding_model != expected_model {
            return Err(StoreError::CorruptIndex(format!(
                "index was built with embedding model '{}', configured model is '{expected_model}'",
                manifest.embedding_model
            )));
        }
        if vectors.rows.len() != manifest.chunks.len() {
            return Err(StoreError::CorruptIndex(format!(
                "{} vector rows but {} manifest records",
                vectors.rows.len(),
                manifest.chunks.len()
            )));
        }
        if vectors.dim != manifest.dim {
            return Err(StoreError::CorruptIndex(format!(
                "vectors claim dim {} but manifest claims {}",
                vectors.dim, manifest.dim
            )));
        }
        if let Some(row) = vectors.rows.iter().find(|r| r.len() != vectors.dim) {
            return Err(StoreError::CorruptIndex(format!(
                "vector row of length {} in a dim-{} index",
                row.len(),
                vectors.dim
            )));
        }

        let _writer = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let rows = manifest.chunks.len();
        *inner = Inner {
            dim: manifest.dim,
            embedding_model: manifest.embedding_model,
            vectors: vectors.rows,
            chunks: manifest.chunks,
        };
        drop(inner);
        tracing::info!(rows, "index loaded from disk");
        Ok(())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn persist(dir: &Path, inner: &Inner) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;

    let vectors = VectorsArtifact {
        dim: inner.dim,
        rows: inner.vectors.clone(),
    };
    let manifest = ManifestArtifact {
        version: MANIFEST_VERSION,
        embedding_model: inner.embedding_model.clone(),
        dim: inner.dim,
        chunks: inner.chunks.clone(),
    };

    write_artifact(&dir.join(VECTORS_FILE), &serde_json::to_vec(&vectors)?)?;
    write_artifact(&dir.join(MANIFEST_FILE), &serde_json::to_vec(&manifest)?)?;
    Ok(())
}

/// Write to a sibling temp file, then rename into place.
fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

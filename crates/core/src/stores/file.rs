use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, IngestError, SearchError};
use crate::flat_index::{FlatL2Index, Neighbor};
use crate::models::Chunk;
use crate::traits::VectorIndex;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DEFAULT_INDEX_PATH: &str = "vector_index.bin";
pub const DEFAULT_METADATA_PATH: &str = "metadata.json";
pub const METADATA_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    schema_version: u32,
    built_at: DateTime<Utc>,
    /// sha256 of the index file written in the same rebuild.
    index_digest: String,
    chunks: Vec<Chunk>,
}

/// Index and metadata persisted as two sibling files.
///
/// Row `i` of the bincode-encoded [`FlatL2Index`] belongs to entry `i` of the
/// JSON metadata list. Both files are reloaded on every search so a search
/// always sees the latest rebuild. The lock only orders callers sharing this
/// value; other processes writing the same files are not excluded.
pub struct FileIndexStore {
    index_path: PathBuf,
    metadata_path: PathBuf,
    lock: RwLock<()>,
}

impl Default for FileIndexStore {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_PATH, DEFAULT_METADATA_PATH)
    }
}

impl FileIndexStore {
    pub fn new(index_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_INDEX_PATH), dir.join(DEFAULT_METADATA_PATH))
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn is_initialized(&self) -> bool {
        self.index_path.exists() && self.metadata_path.exists()
    }

    fn load_metadata(&self) -> Result<MetadataFile, SearchError> {
        let raw: Value = serde_json::from_slice(&fs::read(&self.metadata_path)?)?;
        let found = raw
            .get("schema_version")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;

        if found != METADATA_SCHEMA_VERSION {
            return Err(SearchError::IncompatibleSchema {
                found,
                expected: METADATA_SCHEMA_VERSION,
            });
        }

        Ok(serde_json::from_value(raw)?)
    }
}

impl VectorIndex for FileIndexStore {
    fn rebuild(&self, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<usize, IngestError> {
        let mut index = FlatL2Index::new(embedder.dimensions());
        for chunk in chunks {
            let vector = embedder.embed(&chunk.text)?;
            if !index.add(&vector) {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: index.dimension(),
                    actual: vector.len(),
                }
                .into());
            }
        }

        let index_bytes = bincode::serialize(&index)?;
        let metadata = MetadataFile {
            schema_version: METADATA_SCHEMA_VERSION,
            built_at: Utc::now(),
            index_digest: digest(&index_bytes),
            chunks: chunks.to_vec(),
        };
        let metadata_bytes = serde_json::to_vec(&metadata)?;

        let _guard = self.lock.write();
        write_replacing(&self.index_path, &index_bytes)?;
        write_replacing(&self.metadata_path, &metadata_bytes)?;

        info!(
            index = %self.index_path.display(),
            rows = index.len(),
            dimension = index.dimension(),
            "vector index rebuilt"
        );

        Ok(chunks.len())
    }

    fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Chunk>, SearchError> {
        let _guard = self.lock.read();

        if !self.is_initialized() {
            return Err(SearchError::NotReady(format!(
                "{} or {} not found, ingest a document first",
                self.index_path.display(),
                self.metadata_path.display()
            )));
        }

        let index_bytes = fs::read(&self.index_path)?;
        let metadata = self.load_metadata()?;

        if digest(&index_bytes) != metadata.index_digest {
            warn!(
                index = %self.index_path.display(),
                metadata = %self.metadata_path.display(),
                "index and metadata come from different rebuilds"
            );
        }

        let index: FlatL2Index = bincode::deserialize(&index_bytes)?;
        if query_vector.len() != index.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: index.dimension(),
                actual: query_vector.len(),
            });
        }

        let neighbors = index.search(query_vector, top_k);
        Ok(chunks_for(&neighbors, &metadata.chunks))
    }
}

/// Maps neighbours to their chunks. Positions past the end of the metadata
/// list are dropped without error.
fn chunks_for(neighbors: &[Neighbor], chunks: &[Chunk]) -> Vec<Chunk> {
    neighbors
        .iter()
        .filter_map(|neighbor| {
            let chunk = chunks.get(neighbor.position);
            if chunk.is_none() {
                debug!(
                    position = neighbor.position,
                    metadata_len = chunks.len(),
                    "skipping index row without metadata"
                );
            }
            chunk.cloned()
        })
        .collect()
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_replacing(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory)?;

    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

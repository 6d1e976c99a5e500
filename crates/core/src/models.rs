use serde::{Deserialize, Serialize};

/// Provenance of a chunk. `page` is only set for paged sources chunked per page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub chunk_index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Fixed-size character windows advancing by `size - overlap`.
    Window { size: usize, overlap: usize },
    /// Split on `". "`, per page when the source is paged.
    Sentences,
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        Self::Window {
            size: 500,
            overlap: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub strategy: ChunkStrategy,
    pub preview_chars: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            preview_chars: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestionReport {
    pub filename: String,
    pub text_preview: String,
    pub chunks_created: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<ChunkMetadata>,
}

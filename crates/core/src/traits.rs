use crate::embeddings::Embedder;
use crate::error::{IngestError, SearchError};
use crate::models::Chunk;

/// A vector index that is replaced wholesale on every rebuild and answers
/// k-nearest-neighbour queries with the chunks stored alongside its rows.
pub trait VectorIndex: Send + Sync {
    /// Embeds every chunk and replaces the stored index with the result.
    /// Nothing is written unless all embeddings succeed.
    fn rebuild(&self, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<usize, IngestError>;

    /// Up to `top_k` chunks, nearest first.
    fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Chunk>, SearchError>;
}

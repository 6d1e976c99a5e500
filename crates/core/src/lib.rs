pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod flat_index;
pub mod ingest;
pub mod models;
pub mod ocr;
pub mod query;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use chunking::{build_chunks, chunk_by_sentence, chunk_text};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    MINILM_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, IngestError, OcrError, SearchError};
pub use extractor::{DocumentExtractor, ExtractedText, FileKind, PageText, TextExtractor};
pub use flat_index::{FlatL2Index, Neighbor};
pub use ingest::{preview, IngestStage, IngestionPipeline, INGEST_SUCCESS_MESSAGE};
pub use models::{
    Chunk, ChunkMetadata, ChunkStrategy, IngestionOptions, IngestionReport, QueryRequest,
    QueryResponse,
};
pub use ocr::{DisabledOcr, HttpOcr, OcrEngine, TesseractOcr};
pub use query::{QueryPipeline, ANSWER_SEPARATOR, QUERY_TOP_K};
pub use stores::FileIndexStore;
pub use traits::VectorIndex;

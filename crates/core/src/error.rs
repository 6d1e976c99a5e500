use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding dimension {actual} does not match expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot embed empty text")]
    EmptyInput,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ocr engine failed: {0}")]
    Engine(String),

    #[error("no ocr engine is configured")]
    NotConfigured,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: .{0}")]
    UnsupportedFileType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("docx parse error: {0}")]
    DocxParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("ocr failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("index encode error: {0}")]
    IndexEncode(#[from] bincode::Error),

    #[error("metadata encode error: {0}")]
    MetadataEncode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("index not initialized: {0}")]
    NotReady(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index decode error: {0}")]
    IndexDecode(#[from] bincode::Error),

    #[error("metadata decode error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("metadata schema version {found} is not supported (expected {expected})")]
    IncompatibleSchema { found: u32, expected: u32 },

    #[error("query vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("ocr failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("invalid image payload: {0}")]
    InvalidImage(#[from] base64::DecodeError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

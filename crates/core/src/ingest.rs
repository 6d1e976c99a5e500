use crate::chunking::build_chunks;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::{extension_of, ExtractedText, FileKind, TextExtractor};
use crate::models::{IngestionOptions, IngestionReport};
use crate::traits::VectorIndex;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INGEST_SUCCESS_MESSAGE: &str = "File uploaded and indexed successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Extracted,
    Chunked,
    Embedded,
    Indexed,
    Done,
}

/// Extract, chunk, embed and index a single document, replacing whatever the
/// store held before. The store is only touched once every chunk is embedded.
pub struct IngestionPipeline<V: VectorIndex> {
    store: Arc<V>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
    options: IngestionOptions,
}

impl<V: VectorIndex> IngestionPipeline<V> {
    pub fn new(
        store: Arc<V>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
        options: IngestionOptions,
    ) -> Self {
        Self {
            store,
            embedder,
            extractor,
            options,
        }
    }

    /// Ingests an uploaded file. The bytes are spooled to a temp file carrying
    /// the upload's extension, which is removed before indexing starts.
    pub fn ingest_bytes(&self, filename: &str, bytes: &[u8]) -> Result<IngestionReport, IngestError> {
        let kind = FileKind::from_filename(filename)?;
        debug!(filename, stage = ?IngestStage::Received, bytes = bytes.len(), "upload received");

        let extracted = {
            let mut spool = tempfile::Builder::new()
                .prefix("rag-upload-")
                .suffix(&format!(".{}", extension_of(filename)))
                .tempfile()?;
            spool.write_all(bytes)?;
            spool.flush()?;
            self.extractor.extract(spool.path(), kind)
        };

        self.index_extracted(filename, extracted)
    }

    pub fn ingest_path(&self, path: &Path) -> Result<IngestionReport, IngestError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;
        let kind = FileKind::from_filename(filename)?;
        debug!(filename, stage = ?IngestStage::Received, "file received");

        self.index_extracted(filename, self.extractor.extract(path, kind))
    }

    fn index_extracted(
        &self,
        filename: &str,
        extracted: Result<ExtractedText, IngestError>,
    ) -> Result<IngestionReport, IngestError> {
        let mut stage = IngestStage::Received;
        let result = self.run_stages(filename, extracted, &mut stage);

        match &result {
            Ok(report) => info!(filename, chunks = report.chunks_created, "document indexed"),
            Err(error) => warn!(filename, stage = ?stage, error = %error, "ingestion failed"),
        }

        result
    }

    fn run_stages(
        &self,
        filename: &str,
        extracted: Result<ExtractedText, IngestError>,
        stage: &mut IngestStage,
    ) -> Result<IngestionReport, IngestError> {
        let extracted = extracted?;
        let text = extracted.full_text();
        *stage = IngestStage::Extracted;
        debug!(filename, stage = ?stage, chars = text.chars().count(), "text extracted");

        let chunks = build_chunks(filename, &extracted, self.options.strategy)?;
        *stage = IngestStage::Chunked;
        debug!(filename, stage = ?stage, chunks = chunks.len(), "text chunked");

        *stage = IngestStage::Embedded;
        let chunks_created = self.store.rebuild(&chunks, self.embedder.as_ref())?;
        *stage = IngestStage::Indexed;
        debug!(filename, stage = ?stage, chunks_created, "index replaced");

        *stage = IngestStage::Done;
        Ok(IngestionReport {
            filename: filename.to_string(),
            text_preview: preview(&text, self.options.preview_chars),
            chunks_created,
            message: INGEST_SUCCESS_MESSAGE.to_string(),
        })
    }
}

/// First `limit` characters, with `"..."` appended when anything was cut.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

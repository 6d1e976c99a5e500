use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{Chunk, QueryRequest, QueryResponse};
use crate::ocr::OcrEngine;
use crate::traits::VectorIndex;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use tracing::{debug, info};

pub const QUERY_TOP_K: usize = 5;
pub const ANSWER_SEPARATOR: &str = "\n---\n";
pub const OCR_CONTEXT_HEADER: &str = "\n\nAdditional context from image OCR:\n";

/// Answers a question with the nearest stored chunks, verbatim. An attached
/// image is OCR'd and its text appended to the question before embedding.
pub struct QueryPipeline<V: VectorIndex> {
    store: Arc<V>,
    embedder: Arc<dyn Embedder>,
    ocr: Arc<dyn OcrEngine>,
}

impl<V: VectorIndex> QueryPipeline<V> {
    pub fn new(store: Arc<V>, embedder: Arc<dyn Embedder>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            store,
            embedder,
            ocr,
        }
    }

    pub fn answer(&self, request: &QueryRequest) -> Result<QueryResponse, SearchError> {
        let ocr_text = match request.image_base64.as_deref() {
            Some(image) if !image.is_empty() => self.perform_ocr(image)?,
            _ => String::new(),
        };

        let combined = combine_question(&request.question, &ocr_text);
        let query_vector = self.embedder.embed(&combined)?;
        let chunks = self.store.search(&query_vector, QUERY_TOP_K)?;

        info!(
            question_chars = request.question.chars().count(),
            ocr_chars = ocr_text.chars().count(),
            hits = chunks.len(),
            "query answered"
        );

        Ok(assemble_response(chunks))
    }

    pub fn perform_ocr(&self, image_base64: &str) -> Result<String, SearchError> {
        let image = STANDARD.decode(image_base64.trim())?;
        let text = self.ocr.recognize(&image)?;
        debug!(image_bytes = image.len(), "image recognized");
        Ok(text.trim().to_string())
    }
}

pub fn combine_question(question: &str, ocr_text: &str) -> String {
    if ocr_text.is_empty() {
        question.to_string()
    } else {
        format!("{question}{OCR_CONTEXT_HEADER}{ocr_text}")
    }
}

pub fn assemble_response(chunks: Vec<Chunk>) -> QueryResponse {
    let answer = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(ANSWER_SEPARATOR);

    QueryResponse {
        answer,
        sources: chunks.into_iter().map(|chunk| chunk.metadata).collect(),
    }
}

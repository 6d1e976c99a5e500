use crate::error::IngestError;
use crate::extractor::ExtractedText;
use crate::models::{Chunk, ChunkMetadata, ChunkStrategy};

/// Splits `text` into windows of `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one.
///
/// Offsets count Unicode scalar values, so multi-byte text is never split
/// inside a character. Windows keep coming until a start offset passes the
/// end, so the last one may lie entirely inside its predecessor.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, IngestError> {
    if chunk_size == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(IngestError::InvalidChunkConfig(format!(
            "overlap {overlap} must be smaller than chunk size {chunk_size}"
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }

    Ok(chunks)
}

pub fn chunk_by_sentence(text: &str) -> Vec<String> {
    text.split(". ")
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turns extracted text into indexed chunks. Windows run over the whole text;
/// sentences run per page for paged sources so each chunk keeps its page.
/// `chunk_index` is the chunk's row in the rebuilt index.
pub fn build_chunks(
    filename: &str,
    extracted: &ExtractedText,
    strategy: ChunkStrategy,
) -> Result<Vec<Chunk>, IngestError> {
    let pieces: Vec<(Option<u32>, String)> = match strategy {
        ChunkStrategy::Window { size, overlap } => chunk_text(&extracted.full_text(), size, overlap)?
            .into_iter()
            .map(|text| (None, text))
            .collect(),
        ChunkStrategy::Sentences if extracted.kind.is_paged() => extracted
            .pages
            .iter()
            .flat_map(|page| {
                chunk_by_sentence(&page.text)
                    .into_iter()
                    .map(move |text| (Some(page.number), text))
            })
            .collect(),
        ChunkStrategy::Sentences => chunk_by_sentence(&extracted.full_text())
            .into_iter()
            .map(|text| (None, text))
            .collect(),
    };

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, (page, text))| Chunk {
            text,
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                page,
                chunk_index: index as u64,
            },
        })
        .collect())
}

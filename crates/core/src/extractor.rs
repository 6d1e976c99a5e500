use crate::error::IngestError;
use crate::ocr::OcrEngine;
use lopdf::Document;
use regex::Regex;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Txt,
    Image,
}

impl FileKind {
    /// Resolves the kind from a file name's last extension, case-insensitively.
    /// A name without a dot is treated as being all extension.
    pub fn from_filename(filename: &str) -> Result<Self, IngestError> {
        let extension = extension_of(filename);
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            "jpg" | "jpeg" | "png" => Ok(Self::Image),
            _ => Err(IngestError::UnsupportedFileType(extension)),
        }
    }

    pub fn is_paged(self) -> bool {
        matches!(self, Self::Pdf)
    }
}

pub fn extension_of(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub kind: FileKind,
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    fn single(kind: FileKind, text: String) -> Self {
        Self {
            kind,
            pages: vec![PageText { number: 1, text }],
        }
    }

    /// Page texts joined by newlines. Only paged sources are trimmed; plain
    /// text, DOCX and OCR output keep their whitespace.
    pub fn full_text(&self) -> String {
        let text = self
            .pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if self.kind.is_paged() {
            text.trim().to_string()
        } else {
            text
        }
    }
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path, kind: FileKind) -> Result<ExtractedText, IngestError>;
}

/// Dispatches on file kind: lopdf for PDF, the zipped WordprocessingML body for
/// DOCX, UTF-8 for plain text, and the configured OCR engine for images.
pub struct DocumentExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl DocumentExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, path: &Path, kind: FileKind) -> Result<ExtractedText, IngestError> {
        match kind {
            FileKind::Pdf => Ok(ExtractedText {
                kind,
                pages: extract_pdf_pages(path)?,
            }),
            FileKind::Docx => Ok(ExtractedText::single(kind, extract_docx_text(path)?)),
            FileKind::Txt => Ok(ExtractedText::single(kind, fs::read_to_string(path)?)),
            FileKind::Image => {
                let image = fs::read(path)?;
                Ok(ExtractedText::single(kind, self.ocr.recognize(&image)?))
            }
        }
    }
}

pub fn extract_pdf_pages(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let document = Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(PageText {
                number: page_no,
                text,
            });
        }
    }

    if pages.is_empty() {
        return Err(IngestError::PdfParse(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(pages)
}

pub fn extract_docx_text(path: &Path) -> Result<String, IngestError> {
    let mut archive =
        ZipArchive::new(File::open(path)?).map_err(|error| IngestError::DocxParse(error.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|error| IngestError::DocxParse(error.to_string()))?
        .read_to_string(&mut xml)?;

    docx_paragraphs(&xml)
}

/// One line per `<w:p>` paragraph, concatenating its `<w:t>` runs.
fn docx_paragraphs(xml: &str) -> Result<String, IngestError> {
    let paragraph_re = Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)")?;
    let run_re = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>")?;

    let paragraphs = paragraph_re
        .captures_iter(xml)
        .map(|paragraph| {
            paragraph
                .get(1)
                .map(|body| {
                    run_re
                        .captures_iter(body.as_str())
                        .filter_map(|run| run.get(1))
                        .map(|text| unescape_xml(text.as_str()))
                        .collect::<String>()
                })
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    Ok(paragraphs.join("\n"))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::build_chunks;
    use crate::error::OcrError;
    use crate::models::ChunkStrategy;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::io::{Cursor, Write};
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    struct EchoOcr;

    impl OcrEngine for EchoOcr {
        fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
            Ok(format!("ocr:{}", String::from_utf8_lossy(image)))
        }
    }

    fn write_docx(path: &Path, document_xml: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("word/document.xml", SimpleFileOptions::default())?;
        writer.write_all(document_xml.as_bytes())?;
        let bytes = writer.finish()?.into_inner();
        fs::write(path, bytes)?;
        Ok(())
    }

    fn write_pdf(path: &Path, pages: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages.len() as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document.save(path)?;
        Ok(())
    }

    #[test]
    fn file_kind_is_case_insensitive() {
        assert_eq!(FileKind::from_filename("Report.PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_filename("scan.JpEg").unwrap(), FileKind::Image);
        assert_eq!(FileKind::from_filename("a.b.docx").unwrap(), FileKind::Docx);
    }

    #[test]
    fn unsupported_extension_is_reported_with_dot() {
        let error = FileKind::from_filename("anim.gif").unwrap_err();
        assert_eq!(error.to_string(), "Unsupported file type: .gif");

        let error = FileKind::from_filename("README").unwrap_err();
        assert_eq!(error.to_string(), "Unsupported file type: .readme");
    }

    #[test]
    fn docx_paragraphs_are_joined_by_newlines() {
        let xml = concat!(
            r#"<w:document><w:body>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Pump </w:t></w:r><w:r><w:t xml:space="preserve">manual</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p w:rsidR="00AB"><w:r><w:tab/><w:t>Torque &amp; speed &lt;5%</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#
        );

        let text = docx_paragraphs(xml).unwrap();
        assert_eq!(text, "Pump manual\n\nTorque & speed <5%");
    }

    #[test]
    fn docx_file_is_read_from_archive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.docx");
        write_docx(&path, "<w:p><w:r><w:t>hello docx</w:t></w:r></w:p>")?;

        let extractor = DocumentExtractor::new(Arc::new(EchoOcr));
        let extracted = extractor.extract(&path, FileKind::Docx)?;
        assert_eq!(extracted.full_text(), "hello docx");
        Ok(())
    }

    #[test]
    fn broken_docx_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"not a zip")?;

        let result = extract_docx_text(&path);
        assert!(matches!(result, Err(IngestError::DocxParse(_))));
        Ok(())
    }

    #[test]
    fn broken_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        assert!(matches!(extract_pdf_pages(&path), Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn text_and_images_become_a_single_page() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let txt = dir.path().join("a.txt");
        let png = dir.path().join("a.png");
        fs::write(&txt, "  plain words \n")?;
        fs::write(&png, "pixels")?;

        let extractor = DocumentExtractor::new(Arc::new(EchoOcr));
        let text = extractor.extract(&txt, FileKind::Txt)?;
        assert_eq!(text.pages.len(), 1);
        assert_eq!(text.full_text(), "  plain words \n");

        let image = extractor.extract(&png, FileKind::Image)?;
        assert_eq!(image.full_text(), "ocr:pixels");
        Ok(())
    }

    #[test]
    fn pdf_pages_keep_their_numbers() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("manual.pdf");
        write_pdf(&path, &["Open the valve. Check the seal", "", "Restart the pump"])?;

        let pages = extract_pdf_pages(&path)?;
        let numbers: Vec<_> = pages.iter().map(|page| page.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert!(pages[0].text.contains("Open the valve. Check the seal"));
        assert!(pages[1].text.contains("Restart the pump"));
        Ok(())
    }

    #[test]
    fn pdf_sentence_chunks_carry_source_page() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("manual.pdf");
        write_pdf(&path, &["Open the valve. Check the seal", "Restart the pump"])?;

        let extractor = DocumentExtractor::new(Arc::new(EchoOcr));
        let extracted = extractor.extract(&path, FileKind::Pdf)?;
        let chunks = build_chunks("manual.pdf", &extracted, ChunkStrategy::Sentences)?;

        let rows: Vec<_> = chunks
            .iter()
            .map(|chunk| (chunk.text.as_str(), chunk.metadata.page, chunk.metadata.chunk_index))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Open the valve", Some(1), 0),
                ("Check the seal", Some(1), 1),
                ("Restart the pump", Some(2), 2),
            ]
        );
        Ok(())
    }
}

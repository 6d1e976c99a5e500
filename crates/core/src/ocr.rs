use crate::error::OcrError;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Runs the `tesseract` CLI, feeding the image on stdin and reading text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pub binary: PathBuf,
    pub language: Option<String>,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: None,
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut command = Command::new(&self.binary);
        command.arg("stdin").arg("stdout");
        if let Some(language) = &self.language {
            command.arg("-l").arg(language);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(error) = stdin.write_all(image) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(OcrError::Io(error));
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, Serialize)]
struct HttpOcrRequest {
    image_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
struct HttpOcrResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    pages: Option<Vec<HttpOcrPage>>,
}

#[derive(Debug, Clone, Deserialize)]
struct HttpOcrPage {
    #[serde(default)]
    text: Option<String>,
}

/// OCR behind an HTTP endpoint (for example a multimodal model wrapper).
#[derive(Debug, Clone)]
pub struct HttpOcr {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl HttpOcr {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.and_then(|value| {
                let key = value.trim().to_string();
                if key.is_empty() {
                    None
                } else {
                    Some(key)
                }
            }),
        }
    }
}

impl OcrEngine for HttpOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let payload = HttpOcrRequest {
            image_base64: STANDARD.encode(image),
        };

        let mut request = Client::new()
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(OcrError::Engine(format!(
                "ocr request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: HttpOcrResponse = response.json()?;
        Ok(payload_to_text(&payload))
    }
}

/// Stand-in used when OCR is disabled; any image input fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

impl OcrEngine for DisabledOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::NotConfigured)
    }
}

fn payload_to_text(payload: &HttpOcrResponse) -> String {
    if let Some(text) = payload.text.as_deref().filter(|text| !text.trim().is_empty()) {
        return text.to_string();
    }

    payload
        .pages
        .iter()
        .flatten()
        .filter_map(|page| page.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

mod server;

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use rag_index_core::stores::{DEFAULT_INDEX_PATH, DEFAULT_METADATA_PATH};
use rag_index_core::{
    CharacterNgramEmbedder, ChunkStrategy, DisabledOcr, DocumentExtractor, Embedder,
    FileIndexStore, HttpEmbedder, HttpOcr, IngestionOptions, IngestionPipeline, OcrEngine,
    QueryPipeline, QueryRequest, TesseractOcr, DEFAULT_EMBEDDING_DIMENSIONS,
    MINILM_EMBEDDING_DIMENSIONS,
};
use server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rag-index", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector index file (bincode flat L2 index)
    #[arg(long, env = "RAG_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
    index_path: PathBuf,

    /// Chunk metadata file, parallel to the index rows
    #[arg(long, env = "RAG_METADATA_PATH", default_value = DEFAULT_METADATA_PATH)]
    metadata_path: PathBuf,

    /// Embedding backend
    #[arg(long, env = "RAG_EMBEDDER", value_enum, default_value_t = EmbedderKind::Ngram)]
    embedder: EmbedderKind,

    /// Embedding endpoint used by the http embedder
    #[arg(long, env = "RAG_EMBEDDING_URL", default_value = "http://localhost:11434/api/embed")]
    embedding_url: String,

    /// Embedding model name sent to the endpoint
    #[arg(long, env = "RAG_EMBEDDING_MODEL", default_value = "all-minilm")]
    embedding_model: String,

    /// Vector dimension; defaults to 128 for ngram and 384 for http
    #[arg(long, env = "RAG_EMBEDDING_DIMENSIONS")]
    embedding_dimensions: Option<usize>,

    /// Bearer token for the embedding endpoint
    #[arg(long, env = "RAG_EMBEDDING_API_KEY")]
    embedding_api_key: Option<String>,

    /// OCR backend for images
    #[arg(long, env = "RAG_OCR", value_enum, default_value_t = OcrKind::Tesseract)]
    ocr: OcrKind,

    /// tesseract executable
    #[arg(long, env = "RAG_TESSERACT_BIN", default_value = "tesseract")]
    tesseract_bin: PathBuf,

    /// tesseract language, e.g. `eng`
    #[arg(long, env = "RAG_TESSERACT_LANG")]
    tesseract_lang: Option<String>,

    /// OCR endpoint used by the http OCR backend
    #[arg(long, env = "RAG_OCR_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// Bearer token for the OCR endpoint
    #[arg(long, env = "RAG_OCR_API_KEY")]
    ocr_api_key: Option<String>,

    /// Chunking strategy
    #[arg(long, env = "RAG_CHUNK_STRATEGY", value_enum, default_value_t = StrategyKind::Window)]
    chunk_strategy: StrategyKind,

    /// Window size in characters
    #[arg(long, env = "RAG_CHUNK_SIZE", default_value = "500")]
    chunk_size: usize,

    /// Characters shared by consecutive windows
    #[arg(long, env = "RAG_CHUNK_OVERLAP", default_value = "50")]
    chunk_overlap: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbedderKind {
    Ngram,
    Http,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OcrKind {
    Tesseract,
    Http,
    None,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyKind {
    Window,
    Sentences,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "RAG_BIND", default_value = "0.0.0.0:8000")]
        bind: String,
    },
    /// Replace the index with the chunks of one document.
    Ingest {
        /// Document to ingest (pdf, docx, txt, jpg, jpeg, png).
        #[arg(long)]
        file: PathBuf,
    },
    /// Retrieve the chunks nearest to a question.
    Query {
        /// Question text.
        #[arg(long)]
        question: String,
        /// Image whose OCR text is appended to the question.
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

impl Cli {
    fn build_embedder(&self) -> Arc<dyn Embedder> {
        match self.embedder {
            EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder {
                dimensions: self
                    .embedding_dimensions
                    .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS),
            }),
            EmbedderKind::Http => Arc::new(
                HttpEmbedder::new(
                    &self.embedding_url,
                    &self.embedding_model,
                    self.embedding_dimensions
                        .unwrap_or(MINILM_EMBEDDING_DIMENSIONS),
                )
                .with_api_key(self.embedding_api_key.clone()),
            ),
        }
    }

    fn build_ocr(&self) -> anyhow::Result<Arc<dyn OcrEngine>> {
        let engine: Arc<dyn OcrEngine> = match self.ocr {
            OcrKind::Tesseract => Arc::new(TesseractOcr {
                binary: self.tesseract_bin.clone(),
                language: self.tesseract_lang.clone(),
            }),
            OcrKind::Http => {
                let Some(endpoint) = self.ocr_endpoint.as_deref().map(str::trim) else {
                    bail!("--ocr http requires --ocr-endpoint or RAG_OCR_ENDPOINT");
                };
                if endpoint.is_empty() {
                    bail!("--ocr-endpoint is empty");
                }
                Arc::new(HttpOcr::new(endpoint, self.ocr_api_key.clone()))
            }
            OcrKind::None => Arc::new(DisabledOcr),
        };
        Ok(engine)
    }

    fn ingestion_options(&self) -> IngestionOptions {
        let strategy = match self.chunk_strategy {
            StrategyKind::Window => ChunkStrategy::Window {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            },
            StrategyKind::Sentences => ChunkStrategy::Sentences,
        };

        IngestionOptions {
            strategy,
            ..IngestionOptions::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.chunk_overlap >= cli.chunk_size {
        bail!(
            "chunk overlap {} must be smaller than chunk size {}",
            cli.chunk_overlap,
            cli.chunk_size
        );
    }

    let store = Arc::new(FileIndexStore::new(&cli.index_path, &cli.metadata_path));
    let embedder = cli.build_embedder();
    let ocr = cli.build_ocr()?;

    let ingestion = Arc::new(IngestionPipeline::new(
        store.clone(),
        embedder.clone(),
        Arc::new(DocumentExtractor::new(ocr.clone())),
        cli.ingestion_options(),
    ));
    let query = Arc::new(QueryPipeline::new(store, embedder.clone(), ocr));

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        index = %cli.index_path.display(),
        metadata = %cli.metadata_path.display(),
        embedder = ?cli.embedder,
        dimensions = embedder.dimensions(),
        ocr = ?cli.ocr,
        "rag-index boot"
    );

    match cli.command {
        Command::Serve { bind } => {
            server::serve(&bind, AppState::new(ingestion, query)).await?;
        }
        Command::Ingest { file } => {
            let report = tokio::task::spawn_blocking(move || ingestion.ingest_path(&file))
                .await??;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Query { question, image } => {
            let image_base64 = match image {
                Some(path) => Some(STANDARD.encode(
                    std::fs::read(&path)
                        .with_context(|| format!("reading image {}", path.display()))?,
                )),
                None => None,
            };
            let request = QueryRequest {
                question,
                image_base64,
            };

            let response = tokio::task::spawn_blocking(move || query.answer(&request))
                .await??;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

//! HTTP surface over the ingestion and query pipelines.
//!
//! | Method | Path      | Description |
//! |--------|-----------|-------------|
//! | `GET`  | `/`       | Liveness check. |
//! | `POST` | `/ingest` | Multipart upload (field `file`); replaces the index. |
//! | `POST` | `/query`  | `{question, image_base64?}` → `{answer, sources}`. |
//!
//! Pipeline failures are reported as `200 OK` with an `{"error": ...}` body.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rag_index_core::{FileIndexStore, IngestionPipeline, QueryPipeline, QueryRequest};
use serde_json::json;
use std::fmt::Display;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    ingestion: Arc<IngestionPipeline<FileIndexStore>>,
    query: Arc<QueryPipeline<FileIndexStore>>,
}

impl AppState {
    pub fn new(
        ingestion: Arc<IngestionPipeline<FileIndexStore>>,
        query: Arc<QueryPipeline<FileIndexStore>>,
    ) -> Self {
        Self { ingestion, query }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/ingest", post(ingest_handler))
        .route("/query", post(query_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "rag api listening");
    axum::serve(listener, build_router(state)).await
}

fn error_body(error: impl Display) -> Response {
    Json(json!({ "error": error.to_string() })).into_response()
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "RAG API is live" }))
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, String> {
    while let Some(field) = multipart.next_field().await.map_err(|error| error.to_string())? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|error| error.to_string())?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err("multipart field `file` is missing".to_string())
}

async fn ingest_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(message) => return error_body(message),
    };

    let pipeline = state.ingestion.clone();
    let result =
        tokio::task::spawn_blocking(move || pipeline.ingest_bytes(&upload.filename, &upload.bytes))
            .await;

    match result {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(error)) => error_body(error),
        Err(error) => {
            warn!(error = %error, "ingestion task panicked");
            error_body(error)
        }
    }
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    let pipeline = state.query.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.answer(&request)).await;

    match result {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(error)) => {
            warn!(error = %error, "query failed");
            error_body(error)
        }
        Err(error) => {
            warn!(error = %error, "query task panicked");
            error_body(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rag_index_core::{
        CharacterNgramEmbedder, DisabledOcr, DocumentExtractor, IngestionOptions,
    };
    use serde_json::Value;
    use std::path::Path;
    use tempfile::tempdir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "rag-test-boundary";

    fn app(dir: &Path) -> (Router, Arc<FileIndexStore>) {
        let store = Arc::new(FileIndexStore::in_dir(dir));
        let embedder = Arc::new(CharacterNgramEmbedder::default());
        let ocr = Arc::new(DisabledOcr);
        let ingestion = Arc::new(IngestionPipeline::new(
            store.clone(),
            embedder.clone(),
            Arc::new(DocumentExtractor::new(ocr.clone())),
            IngestionOptions::default(),
        ));
        let query = Arc::new(QueryPipeline::new(store.clone(), embedder, ocr));
        (build_router(AppState::new(ingestion, query)), store)
    }

    fn upload(filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/ingest")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn query(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let dir = tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("request success");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await, json!({ "message": "RAG API is live" }));
    }

    #[tokio::test]
    async fn unsupported_upload_is_a_200_error() {
        let dir = tempdir().unwrap();
        let (app, store) = app(dir.path());

        let response = app.oneshot(upload("clip.gif", "GIF89a")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_of(response).await,
            json!({ "error": "Unsupported file type: .gif" })
        );
        assert!(!store.is_initialized());
    }

    #[tokio::test]
    async fn query_before_ingest_reports_error() {
        let dir = tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .oneshot(query(json!({ "question": "anything?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        let error = body["error"].as_str().unwrap_or_default();
        assert!(error.starts_with("index not initialized"), "{error}");
    }

    #[tokio::test]
    async fn ingest_then_query_returns_chunks_and_sources() {
        let dir = tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .clone()
            .oneshot(upload("pumps.txt", "Centrifugal pumps need priming before start."))
            .await
            .unwrap();
        let report = json_of(response).await;
        assert_eq!(report["filename"], "pumps.txt");
        assert_eq!(report["chunks_created"], 1);
        assert_eq!(report["message"], "File uploaded and indexed successfully.");
        assert_eq!(
            report["text_preview"],
            "Centrifugal pumps need priming before start."
        );

        let response = app
            .oneshot(query(json!({ "question": "how to start a pump", "image_base64": null })))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["answer"], "Centrifugal pumps need priming before start.");
        assert_eq!(
            body["sources"],
            json!([{ "filename": "pumps.txt", "chunk_index": 0 }])
        );
    }

    #[tokio::test]
    async fn upload_without_file_field_is_reported() {
        let dir = tempdir().unwrap();
        let (app, _) = app(dir.path());

        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/ingest")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            json_of(response).await,
            json!({ "error": "multipart field `file` is missing" })
        );
    }
}

//! HTTP server exposing the extraction pipeline.
//!
//! - `POST /upload`: multipart upload (field `file`), returns text and cédula
//! - `GET /health`: liveness plus external tool availability

mod error;
mod handlers;
mod routes;
mod upload;

pub use error::{ApiError, ErrorResponse, PROCESSING_FAILED};
pub use handlers::{ExtractionResponse, HealthResponse};
pub use routes::create_router;
pub use upload::{receive_file, UploadError, FILE_FIELD};

use std::net::SocketAddr;

use tokio::signal;

use crate::config::Settings;
use crate::services::Pipeline;
use crate::storage::ScratchSpace;

/// Shared state for the web server.
///
/// Requests share no mutable state; each one works in its own scratch dir.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub scratch: ScratchSpace,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            pipeline: settings.build_pipeline(),
            scratch: settings.scratch_space(),
            max_upload_bytes: settings.max_upload_bytes,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    state.scratch.ensure_root()?;

    if !state.pipeline.ocr().is_available() {
        tracing::warn!("{}", state.pipeline.ocr().availability_hint());
    }
    if !state.pipeline.rasterizer().is_available() {
        tracing::warn!(
            "{} not found; PDF uploads will fail (install poppler-utils)",
            state.pipeline.rasterizer().name()
        );
    }

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    tracing::info!("Starting server at http://{}", addr);
    tracing::info!("Scratch directory: {}", state.scratch.root().display());

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolve when Ctrl+C or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    use crate::ocr::test_support::{FakeOcr, FakeRasterizer, OCR_FAIL_MARKER};
    use crate::services::StageLimits;

    const BOUNDARY: &str = "cedula-test-boundary";

    fn setup_test_app(max_upload_bytes: u64) -> (axum::Router, TempDir) {
        let dir = tempdir().unwrap();
        let state = AppState {
            pipeline: Pipeline::new(
                Arc::new(FakeOcr::default()),
                Arc::new(FakeRasterizer),
                StageLimits::default(),
            ),
            scratch: ScratchSpace::new(dir.path()),
            max_upload_bytes,
        };
        (create_router(state), dir)
    }

    fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_image_with_cedula() {
        let (app, _dir) = setup_test_app(1024 * 1024);
        let body = multipart_body(
            "file",
            "cedula.png",
            b"CEDULA DE CIUDADANIA NUMERO - 12.345.678\n",
        );

        let (status, json) = send(app, upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], "CEDULA DE CIUDADANIA NUMERO - 12.345.678");
        assert_eq!(json["cedula"], "12345678");
        assert_eq!(json["pages"], 1);
    }

    #[tokio::test]
    async fn test_image_without_cedula() {
        let (app, _dir) = setup_test_app(1024 * 1024);
        let body = multipart_body("file", "recibo.jpg", b"\n  Recibo de caja menor  \n");

        let (status, json) = send(app, upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], "Recibo de caja menor");
        assert!(json["cedula"].is_null());
    }

    #[tokio::test]
    async fn test_three_page_pdf() {
        let (app, _dir) = setup_test_app(1024 * 1024);
        let body = multipart_body(
            "file",
            "scan.PDF",
            "pagina uno\u{c}pagina dos\u{c}pagina tres".as_bytes(),
        );

        let (status, json) = send(app, upload_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], "pagina uno\npagina dos\npagina tres");
        assert_eq!(json["pages"], 3);
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let (app, _dir) = setup_test_app(1024 * 1024);
        let body = multipart_body("document", "cedula.png", b"NUMERO 12.345.678");

        let (status, json) = send(app, upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("No file uploaded"));
    }

    #[tokio::test]
    async fn test_file_over_limit() {
        let (app, _dir) = setup_test_app(1024);
        let body = multipart_body("file", "big.png", &vec![b'a'; 4096]);

        let (status, json) = send(app, upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "File too large: limit is 1024 bytes");
    }

    #[tokio::test]
    async fn test_empty_file() {
        let (app, _dir) = setup_test_app(1024);
        let body = multipart_body("file", "empty.png", b"");

        let (status, json) = send(app, upload_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Uploaded file is empty");
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let (app, _dir) = setup_test_app(1024);
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("Upload rejected"));
    }

    #[tokio::test]
    async fn test_ocr_failure_is_generic_500() {
        let (app, _dir) = setup_test_app(1024 * 1024);
        let body = multipart_body("file", "bad.png", OCR_FAIL_MARKER.as_bytes());

        let (status, json) = send(app, upload_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], PROCESSING_FAILED);
    }

    #[tokio::test]
    async fn test_scratch_dir_cleaned_up() {
        let (app, dir) = setup_test_app(1024 * 1024);
        let body = multipart_body("file", "scan.pdf", "uno\u{c}dos".as_bytes());

        let (status, _) = send(app.clone(), upload_request(body)).await;
        assert_eq!(status, StatusCode::OK);

        let body = multipart_body("file", "bad.png", OCR_FAIL_MARKER.as_bytes());
        let (status, _) = send(app, upload_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = setup_test_app(1024);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["ocr"], true);
        assert_eq!(json["rasterizer"], true);
    }
}

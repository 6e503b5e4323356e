//! Request handlers.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::error::ApiError;
use super::upload::receive_file;
use super::AppState;
use crate::services::ExtractionResult;

/// Successful extraction response.
#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub text: String,
    /// Normalized cédula digits, `null` when none was found.
    pub cedula: Option<String>,
    pub pages: usize,
}

impl From<ExtractionResult> for ExtractionResponse {
    fn from(result: ExtractionResult) -> Self {
        Self {
            text: result.text,
            cedula: result.cedula,
            pages: result.pages,
        }
    }
}

/// Health response, including external tool availability.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ocr: bool,
    pub rasterizer: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ocr: state.pipeline.ocr().is_available(),
        rasterizer: state.pipeline.rasterizer().is_available(),
    })
}

/// POST /upload
///
/// Accept a single document in the `file` field, OCR it and extract the cédula.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("upload", %request_id);
    process_upload(state, multipart).instrument(span).await
}

async fn process_upload(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected upload request: {}", e);
        ApiError::BadRequest(format!("Upload rejected: {}", e.body_text()))
    })?;

    // Dropped on every exit path, removing the upload and rendered pages.
    let scratch = state.scratch.request_dir()?;

    let file = receive_file(&mut multipart, &scratch, state.max_upload_bytes).await?;

    let result = state
        .pipeline
        .process(&file.path, file.kind, scratch.path())
        .await?;

    Ok(Json(result.into()))
}

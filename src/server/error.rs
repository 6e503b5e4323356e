//! HTTP error responses.
//!
//! Client errors carry their message. Server errors are logged and replaced
//! with a generic message so tool paths and stderr never reach the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::upload::UploadError;
use crate::services::PipelineError;

/// Message returned for every server-side failure.
pub const PROCESSING_FAILED: &str = "Error processing the file";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                PROCESSING_FAILED.to_string(),
            ),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        if e.is_client_error() {
            tracing::warn!("Upload rejected: {}", e);
            ApiError::BadRequest(e.to_string())
        } else {
            tracing::error!("Failed to store upload: {}", e);
            ApiError::Internal
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        tracing::error!("Processing failed: {}", e);
        ApiError::Internal
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        tracing::error!("IO error: {}", e);
        ApiError::Internal
    }
}

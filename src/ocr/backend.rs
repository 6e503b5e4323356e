//! OCR and rasterizer abstractions.
//!
//! The pipeline talks to external tools only through these traits:
//! - `OcrBackend`: image in, recognized text out
//! - `Rasterizer`: PDF in, ordered page images out

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from OCR backends and rasterizers.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One rasterized page of a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page number.
    pub page: u32,
    /// Path to the rendered PNG.
    pub path: PathBuf,
}

/// Configuration shared by the command-line backends.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language code (e.g., "spa", "eng").
    pub language: String,
    /// Rasterization resolution in DPI.
    pub dpi: u32,
    /// Path or name of the tesseract binary.
    pub tesseract_path: PathBuf,
    /// Path or name of the pdftoppm binary.
    pub pdftoppm_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "spa".to_string(),
            dpi: 300,
            tesseract_path: PathBuf::from("tesseract"),
            pdftoppm_path: PathBuf::from("pdftoppm"),
        }
    }
}

/// Trait for OCR backends.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Check if this backend is available (binary installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Extract text from an image file.
    async fn run_ocr(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// Trait for PDF rasterizers.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Short rasterizer name used in logs.
    fn name(&self) -> &'static str;

    /// Check if this rasterizer is available (binary installed).
    fn is_available(&self) -> bool;

    /// Render every page of `pdf_path` into `output_dir`.
    ///
    /// The returned pages are ordered by page number.
    async fn rasterize(&self, pdf_path: &Path, output_dir: &Path)
        -> Result<Vec<PageImage>, OcrError>;
}

//! Extraction pipeline: rasterize (PDFs only), OCR each page in order, then
//! pull the cédula out of the combined text.
//!
//! Failure policy is fail-fast at every stage: a rasterizer error, an OCR
//! error on any page, or a stage exceeding its deadline aborts the whole
//! document. Partial text is never returned.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::cedula::extract_cedula;
use crate::ocr::{OcrBackend, OcrError, PageImage, Rasterizer};
use crate::storage::DocumentKind;

/// Pipeline stage, used in timeout errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rasterize,
    Recognize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Rasterize => write!(f, "rasterize"),
            Stage::Recognize => write!(f, "recognize"),
        }
    }
}

/// Errors that abort the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("PDF conversion failed: {0}")]
    Conversion(#[source] OcrError),

    #[error("PDF conversion produced no pages")]
    NoPages,

    #[error("Recognition failed on page {page}: {source}")]
    Recognition {
        page: u32,
        #[source]
        source: OcrError,
    },

    #[error("{stage} stage timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

/// Per-stage deadlines.
#[derive(Debug, Clone, Copy)]
pub struct StageLimits {
    /// Deadline for rasterizing a whole PDF.
    pub rasterize: Duration,
    /// Deadline for OCR of a single page or image.
    pub recognize: Duration,
}

impl Default for StageLimits {
    fn default() -> Self {
        Self {
            rasterize: Duration::from_secs(120),
            recognize: Duration::from_secs(60),
        }
    }
}

/// Result of running the pipeline on one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    /// OCR text of all pages, trimmed.
    pub text: String,
    /// Normalized cédula digits, if one was found.
    pub cedula: Option<String>,
    /// Number of pages recognized.
    pub pages: usize,
}

/// Orchestrates rasterization, OCR and ID extraction.
#[derive(Clone)]
pub struct Pipeline {
    ocr: Arc<dyn OcrBackend>,
    rasterizer: Arc<dyn Rasterizer>,
    limits: StageLimits,
}

impl Pipeline {
    pub fn new(
        ocr: Arc<dyn OcrBackend>,
        rasterizer: Arc<dyn Rasterizer>,
        limits: StageLimits,
    ) -> Self {
        Self {
            ocr,
            rasterizer,
            limits,
        }
    }

    pub fn ocr(&self) -> &dyn OcrBackend {
        self.ocr.as_ref()
    }

    pub fn rasterizer(&self) -> &dyn Rasterizer {
        self.rasterizer.as_ref()
    }

    /// Run the pipeline on `input`.
    ///
    /// `workdir` receives rasterized pages and must be private to this call.
    pub async fn process(
        &self,
        input: &Path,
        kind: DocumentKind,
        workdir: &Path,
    ) -> Result<ExtractionResult, PipelineError> {
        let start = Instant::now();

        let (raw_text, pages) = match kind {
            DocumentKind::Pdf => self.process_pdf(input, workdir).await?,
            DocumentKind::Image => (self.recognize(input, 1).await?, 1),
        };

        let text = raw_text.trim().to_string();
        let cedula = extract_cedula(&text);

        tracing::info!(
            "Processed {} ({} page(s), {} chars) in {}ms, cedula {}",
            kind,
            pages,
            text.chars().count(),
            start.elapsed().as_millis(),
            if cedula.is_some() { "found" } else { "not found" }
        );

        Ok(ExtractionResult {
            text,
            cedula,
            pages,
        })
    }

    async fn process_pdf(
        &self,
        pdf_path: &Path,
        workdir: &Path,
    ) -> Result<(String, usize), PipelineError> {
        let pages = self.rasterize(pdf_path, workdir).await?;
        if pages.is_empty() {
            return Err(PipelineError::NoPages);
        }

        tracing::debug!(
            "{} rendered {} page(s) from {}",
            self.rasterizer.name(),
            pages.len(),
            pdf_path.display()
        );

        let mut full_text = String::new();
        for page in &pages {
            let text = self.recognize(&page.path, page.page).await?;
            full_text.push_str(strip_page_trailer(&text));
            full_text.push('\n');
        }

        Ok((full_text, pages.len()))
    }

    async fn rasterize(
        &self,
        pdf_path: &Path,
        workdir: &Path,
    ) -> Result<Vec<PageImage>, PipelineError> {
        let after = self.limits.rasterize;
        match tokio::time::timeout(after, self.rasterizer.rasterize(pdf_path, workdir)).await {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => {
                tracing::error!("PDF conversion failed for {}: {}", pdf_path.display(), e);
                Err(PipelineError::Conversion(e))
            }
            Err(_) => {
                tracing::error!("PDF conversion timed out after {:?}", after);
                Err(PipelineError::Timeout {
                    stage: Stage::Rasterize,
                    after,
                })
            }
        }
    }

    async fn recognize(&self, image_path: &Path, page: u32) -> Result<String, PipelineError> {
        let after = self.limits.recognize;
        let start = Instant::now();
        match tokio::time::timeout(after, self.ocr.run_ocr(image_path)).await {
            Ok(Ok(text)) => {
                tracing::debug!(
                    "{} page {}: {} chars in {}ms",
                    self.ocr.name(),
                    page,
                    text.chars().count(),
                    start.elapsed().as_millis()
                );
                Ok(text)
            }
            Ok(Err(e)) => {
                tracing::error!("OCR failed on page {}: {}", page, e);
                Err(PipelineError::Recognition { page, source: e })
            }
            Err(_) => {
                tracing::error!("OCR on page {} timed out after {:?}", page, after);
                Err(PipelineError::Timeout {
                    stage: Stage::Recognize,
                    after,
                })
            }
        }
    }
}

/// Drop the line breaks and form feed tesseract appends after each page.
fn strip_page_trailer(text: &str) -> &str {
    text.trim_end_matches(['\n', '\r', '\u{c}'])
}

//! OCR and rasterization module.
//!
//! Extracts text from uploads using external tools:
//! - Tesseract OCR for images and rasterized PDF pages
//! - pdftoppm (Poppler) to turn PDF pages into PNGs
//!
//! Both sit behind traits (`OcrBackend`, `Rasterizer`) so the pipeline can be
//! exercised without the binaries installed.

mod backend;
mod model_utils;
mod pdf_utils;
mod tesseract;

pub use backend::{OcrBackend, OcrConfig, OcrError, PageImage, Rasterizer};
pub use model_utils::check_binary;
pub use pdf_utils::{collect_page_images, page_number, PdftoppmRasterizer, PAGE_PREFIX};
pub use tesseract::TesseractBackend;

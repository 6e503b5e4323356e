//! cedula-ocr - OCR service for Colombian identity documents.
//!
//! Accepts an image or PDF, runs Tesseract over every page and extracts the
//! cédula de ciudadanía number from the recognized text.

pub mod cli;
pub mod config;
pub mod ocr;
pub mod server;
pub mod services;
pub mod storage;

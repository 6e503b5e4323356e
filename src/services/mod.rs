//! Service layer for the extraction logic.
//!
//! Services are shared by the HTTP server and the CLI.

pub mod cedula;
pub mod pipeline;

pub use cedula::extract_cedula;
pub use pipeline::{ExtractionResult, Pipeline, PipelineError, Stage, StageLimits};

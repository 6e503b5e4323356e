//! Shared helpers for the command-line OCR tools.

use std::path::Path;
use std::process::Output;

use super::backend::OcrError;

pub const TESSERACT_NOT_FOUND: &str = "tesseract not found (install tesseract-ocr)";
pub const PDFTOPPM_NOT_FOUND: &str = "pdftoppm not found (install poppler-utils)";

/// Check if a binary is available, either as a path or by name in PATH.
pub fn check_binary(name: &Path) -> bool {
    which::which(name).is_ok()
}

/// Turn a finished command into its stdout, or an `OcrError` describing why it failed.
pub fn handle_cmd_output(
    result: std::io::Result<Output>,
    not_found: &str,
    error_prefix: &str,
) -> Result<String, OcrError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(OcrError::BackendNotAvailable(not_found.to_string()))
        }
        Err(e) => Err(OcrError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_maps_to_not_available() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let result = handle_cmd_output(Err(err), TESSERACT_NOT_FOUND, "tesseract failed");
        assert!(matches!(result, Err(OcrError::BackendNotAvailable(msg)) if msg == TESSERACT_NOT_FOUND));
    }

    #[test]
    fn test_other_io_error_is_preserved() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let result = handle_cmd_output(Err(err), TESSERACT_NOT_FOUND, "tesseract failed");
        assert!(matches!(result, Err(OcrError::Io(_))));
    }

    #[test]
    fn test_check_binary_unknown_name() {
        assert!(!check_binary(Path::new("definitely-not-a-real-binary-8c1f")));
    }
}

//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract OCR via command-line for text extraction.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::backend::{OcrBackend, OcrConfig, OcrError};
use super::model_utils::{check_binary, handle_cmd_output, TESSERACT_NOT_FOUND};

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Language passed to `-l`.
    pub fn language(&self) -> &str {
        &self.config.language
    }

    /// List the language packs tesseract reports as installed.
    pub async fn installed_languages(&self) -> Result<Vec<String>, OcrError> {
        let output = Command::new(&self.config.tesseract_path)
            .arg("--list-langs")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let stdout = handle_cmd_output(output, TESSERACT_NOT_FOUND, "tesseract --list-langs failed")?;
        Ok(parse_language_list(&stdout))
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.config.tesseract_path)
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            "Tesseract is available".to_string()
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr tesseract-ocr-spa"
                .to_string()
        }
    }

    async fn run_ocr(&self, image_path: &Path) -> Result<String, OcrError> {
        tracing::debug!(
            "Running tesseract on {} (lang={})",
            image_path.display(),
            self.config.language
        );

        let output = Command::new(&self.config.tesseract_path)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language])
            // No form feed after the page; pages are joined by the pipeline.
            .args(["-c", "page_separator="])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        handle_cmd_output(output, TESSERACT_NOT_FOUND, "tesseract failed")
    }
}

/// Parse `tesseract --list-langs` output.
///
/// The first line is a header ("List of available languages ..."), the rest
/// are language codes, one per line.
fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip_while(|line| line.starts_with("List of"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_list() {
        let out = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\neng\nosd\nspa\n";
        assert_eq!(parse_language_list(out), vec!["eng", "osd", "spa"]);
    }

    #[test]
    fn test_parse_language_list_empty() {
        assert!(parse_language_list("").is_empty());
    }

    #[test]
    fn test_default_language_is_spanish() {
        assert_eq!(TesseractBackend::new().language(), "spa");
    }

    #[tokio::test]
    async fn test_missing_binary_reports_not_available() {
        let backend = TesseractBackend::with_config(OcrConfig {
            tesseract_path: "definitely-not-tesseract-3f9a".into(),
            ..OcrConfig::default()
        });
        assert!(!backend.is_available());
        let err = backend.run_ocr(Path::new("page.png")).await.unwrap_err();
        assert!(matches!(err, OcrError::BackendNotAvailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_ocr_disables_page_separator() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("tesseract");
        std::fs::write(&script, "#!/bin/sh\nprintf '%s\\n' \"$@\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = TesseractBackend::with_config(OcrConfig {
            tesseract_path: script,
            ..OcrConfig::default()
        });
        let args = backend.run_ocr(Path::new("page-1.png")).await.unwrap();
        let args: Vec<&str> = args.lines().collect();

        assert_eq!(
            args,
            vec!["page-1.png", "stdout", "-l", "spa", "-c", "page_separator="]
        );
    }
}

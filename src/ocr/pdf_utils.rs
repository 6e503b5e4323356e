//! PDF-to-image conversion using pdftoppm (Poppler).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::backend::{OcrConfig, OcrError, PageImage, Rasterizer};
use super::model_utils::{check_binary, handle_cmd_output, PDFTOPPM_NOT_FOUND};

/// Filename prefix for rendered pages.
pub const PAGE_PREFIX: &str = "page";

/// Rasterizer backed by the `pdftoppm` command.
pub struct PdftoppmRasterizer {
    pdftoppm_path: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::with_config(&OcrConfig::default())
    }

    pub fn with_config(config: &OcrConfig) -> Self {
        Self {
            pdftoppm_path: config.pdftoppm_path.clone(),
            dpi: config.dpi,
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.pdftoppm_path)
    }

    async fn rasterize(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
    ) -> Result<Vec<PageImage>, OcrError> {
        let dpi = self.dpi.to_string();
        let output = Command::new(&self.pdftoppm_path)
            .args(["-png", "-r", &dpi])
            .arg(pdf_path)
            .arg(output_dir.join(PAGE_PREFIX))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        handle_cmd_output(output, PDFTOPPM_NOT_FOUND, "pdftoppm failed to convert PDF")?;

        collect_page_images(output_dir, PAGE_PREFIX).await
    }
}

/// Parse the page number out of a pdftoppm output filename.
///
/// pdftoppm names files `{prefix}-{n}.png` and zero-pads `n` to the width of
/// the document's page count (page-1.png, page-01.png, page-001.png).
pub fn page_number(filename: &str, prefix: &str) -> Option<u32> {
    filename
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Find every rendered page in `dir`, ordered by page number.
pub async fn collect_page_images(dir: &Path, prefix: &str) -> Result<Vec<PageImage>, OcrError> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(page) = page_number(name, prefix) {
            pages.push(PageImage {
                page,
                path: entry.path(),
            });
        }
    }

    pages.sort_by_key(|p| p.page);
    Ok(pages)
}

//! Scratch storage for uploads and rendered pages.
//!
//! Every request gets its own uniquely named directory under the scratch
//! root. The directory is removed when the `ScratchDir` is dropped, which
//! covers success, error and cancelled requests alike.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Stored name for an upload, without extension.
const UPLOAD_STEM: &str = "upload";

/// Longest extension kept from a client-supplied filename.
const MAX_EXTENSION_LEN: usize = 8;

/// Kind of document, deciding whether the pipeline rasterizes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Decide the kind from the upload's extension, falling back to magic
    /// bytes when there is no usable extension.
    pub fn detect(extension: Option<&str>, head: &[u8]) -> Self {
        match extension {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => DocumentKind::Pdf,
            Some(_) => DocumentKind::Image,
            None => match infer::get(head) {
                Some(kind) if kind.mime_type() == "application/pdf" => DocumentKind::Pdf,
                _ => DocumentKind::Image,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Root directory under which per-request scratch directories are created.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make sure the scratch root exists.
    pub fn ensure_root(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create scratch directory '{}': {}",
                    self.root.display(),
                    e
                ),
            )
        })
    }

    /// Create a fresh, uniquely named directory for one request.
    pub fn request_dir(&self) -> std::io::Result<ScratchDir> {
        let dir = tempfile::Builder::new()
            .prefix("req-")
            .tempdir_in(&self.root)?;
        tracing::debug!("Created scratch dir {}", dir.path().display());
        Ok(ScratchDir { dir })
    }
}

/// A request-scoped scratch directory, deleted on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path under which an upload with the given original filename is stored.
    ///
    /// The original name never reaches the filesystem; only a sanitized
    /// extension is kept.
    pub fn upload_path(&self, extension: Option<&str>) -> PathBuf {
        match extension {
            Some(ext) => self.path().join(format!("{}.{}", UPLOAD_STEM, ext)),
            None => self.path().join(UPLOAD_STEM),
        }
    }
}

/// A file received from a client and stored in a scratch directory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Where the bytes were written.
    pub path: PathBuf,
    /// Filename as sent by the client.
    pub original_name: Option<String>,
    /// Lowercased, sanitized extension of the original name.
    pub extension: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// PDF or image.
    pub kind: DocumentKind,
}

/// Extract a safe, lowercased extension from a client-supplied filename.
///
/// Anything that is not ASCII alphanumeric, or longer than a few characters,
/// is discarded.
pub fn sanitize_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension("scan.PDF"), Some("pdf".to_string()));
        assert_eq!(sanitize_extension("photo.jpeg"), Some("jpeg".to_string()));
        assert_eq!(sanitize_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(sanitize_extension("noext"), None);
        assert_eq!(sanitize_extension("weird.p/df"), None);
        assert_eq!(sanitize_extension("bad.$$$"), None);
        assert_eq!(sanitize_extension("long.abcdefghijk"), None);
    }

    #[test]
    fn test_detect_kind_by_extension() {
        assert_eq!(DocumentKind::detect(Some("pdf"), b""), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect(Some("PDF"), b""), DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect(Some("png"), b"%PDF-1.7"), DocumentKind::Image);
    }

    #[test]
    fn test_detect_kind_by_magic_bytes() {
        assert_eq!(DocumentKind::detect(None, b"%PDF-1.7\n%"), DocumentKind::Pdf);
        assert_eq!(
            DocumentKind::detect(None, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            DocumentKind::Image
        );
        assert_eq!(DocumentKind::detect(None, b""), DocumentKind::Image);
    }

    #[test]
    fn test_request_dirs_are_unique_and_cleaned_up() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path());
        assert_eq!(scratch.root(), root.path());

        let first = scratch.request_dir().unwrap();
        let second = scratch.request_dir().unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(root.path()));

        let kept = first.path().to_path_buf();
        drop(first);
        assert!(!kept.exists());
        assert!(second.path().exists());
    }

    #[test]
    fn test_upload_path_ignores_original_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = ScratchSpace::new(root.path()).request_dir().unwrap();
        assert_eq!(dir.upload_path(Some("pdf")), dir.path().join("upload.pdf"));
        assert_eq!(dir.upload_path(None), dir.path().join("upload"));
    }

    #[test]
    fn test_ensure_root_creates_nested() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        ScratchSpace::new(&nested).ensure_root().unwrap();
        assert!(nested.is_dir());
    }
}

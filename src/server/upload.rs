//! Multipart upload receiver.
//!
//! Streams the `file` field to disk in the request's scratch directory,
//! enforcing the configured size limit as bytes arrive.

use axum::extract::multipart::{Field, Multipart};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::storage::{sanitize_extension, DocumentKind, ScratchDir, UploadedFile};

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

/// Bytes kept from the start of the upload for magic-byte sniffing.
const SNIFF_LEN: usize = 16;

/// Errors while receiving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded. Send the document in the 'file' field")]
    MissingFile,

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("File too large: limit is {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Uploaded file is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client caused this error.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::Io(_))
    }
}

/// Read fields until the `file` field is found and store it.
pub async fn receive_file(
    multipart: &mut Multipart,
    scratch: &ScratchDir,
    max_bytes: u64,
) -> Result<UploadedFile, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Rejected(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != FILE_FIELD {
            tracing::debug!("Skipping multipart field '{}'", name);
            continue;
        }
        return store_field(field, scratch, max_bytes).await;
    }

    tracing::warn!("No '{}' field found in multipart upload", FILE_FIELD);
    Err(UploadError::MissingFile)
}

async fn store_field(
    mut field: Field<'_>,
    scratch: &ScratchDir,
    max_bytes: u64,
) -> Result<UploadedFile, UploadError> {
    let original_name = field.file_name().map(|s| s.to_string());
    let extension = original_name.as_deref().and_then(sanitize_extension);
    let path = scratch.upload_path(extension.as_deref());

    let mut file = tokio::fs::File::create(&path).await?;
    let mut size: u64 = 0;
    let mut head: Vec<u8> = Vec::with_capacity(SNIFF_LEN);

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| UploadError::Rejected(e.body_text()))?
    {
        size += chunk.len() as u64;
        if size > max_bytes {
            return Err(UploadError::TooLarge { limit: max_bytes });
        }
        if head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    if size == 0 {
        return Err(UploadError::Empty);
    }

    let kind = DocumentKind::detect(extension.as_deref(), &head);
    tracing::info!(
        "Received {:?} ({}, {} bytes)",
        original_name.as_deref().unwrap_or("<unnamed>"),
        kind,
        size
    );

    Ok(UploadedFile {
        path,
        original_name,
        extension,
        size,
        kind,
    })
}

//! Text Extraction: uploaded bytes + declared format → plain text.
//!
//! The format is decided once, from the upload's filename, as a `DocumentFormat`.
//! Each variant has exactly one `TextExtractor` implementation. Extraction is
//! CPU-bound and is run on the blocking pool by `extract_upload`.

pub mod docx;

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use docx::DocxExtractor;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Uploaded file '{0}' is empty")]
    EmptyUpload(String),

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Could not read DOCX: {0}")]
    Docx(String),

    #[error("Extractor for '{0}' aborted unexpectedly")]
    Aborted(String),
}

/// Declared format of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    /// `.docx`, and `.doc` on a best-effort basis (only ZIP-based files succeed).
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Anything that is not a PDF or Word file is treated as plain text.
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => DocumentFormat::Pdf,
            Some("docx") | Some("doc") => DocumentFormat::Docx,
            _ => DocumentFormat::PlainText,
        }
    }

    pub fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            DocumentFormat::Pdf => &PdfExtractor,
            DocumentFormat::Docx => &DocxExtractor,
            DocumentFormat::PlainText => &PlainTextExtractor,
        }
    }
}

/// Capability interface: one implementation per `DocumentFormat` variant.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))
    }
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    /// Invalid UTF-8 sequences are dropped rather than rejected.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(bytes);
        Ok(text
            .trim_start_matches('\u{FEFF}')
            .chars()
            .filter(|&c| c != char::REPLACEMENT_CHARACTER)
            .collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Uploads
// ────────────────────────────────────────────────────────────────────────────

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn format(&self) -> DocumentFormat {
        DocumentFormat::from_filename(&self.filename)
    }
}

/// Text extracted from an upload, tagged with the format it was read as.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub filename: String,
    pub format: DocumentFormat,
    pub text: String,
}

/// Extracts text on the blocking pool. A panicking extractor surfaces as
/// `ExtractionError::Aborted` rather than taking the request down.
pub async fn extract_upload(upload: Upload) -> Result<ExtractedDocument, ExtractionError> {
    if upload.bytes.is_empty() {
        return Err(ExtractionError::EmptyUpload(upload.filename));
    }

    let format = upload.format();
    let bytes = upload.bytes.clone();
    let text = tokio::task::spawn_blocking(move || format.extractor().extract(&bytes))
        .await
        .map_err(|_| ExtractionError::Aborted(upload.filename.clone()))??;

    debug!(
        "Extracted {} chars from '{}' as {:?}",
        text.len(),
        upload.filename,
        format
    );

    Ok(ExtractedDocument {
        filename: upload.filename,
        format,
        text,
    })
}

//! PDF text extraction.
//!
//! Reads PDFs with `lopdf` into per-page plain text. Pages are extracted
//! sequentially; callers that load several files run one blocking task per
//! file (see [`extract_all`]).

use crate::model::Document;
use futures::future::join_all;
use lopdf::Document as LoDocument;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during PDF processing
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF file: {0}")]
    OpenError(String),

    #[error("Failed to read PDF: {0}")]
    ReadError(#[from] lopdf::Error),

    #[error("PDF has no pages")]
    EmptyDocument,

    #[error("Not a PDF file: {0}")]
    NotPdf(String),

    #[error("Extraction task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A single page from a PDF document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfPage {
    /// Page index (0-based)
    pub index: u32,
    pub text: String,
}

impl PdfPage {
    /// Check if this page is likely empty or has minimal content
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// PDF metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: u32,
}

/// A PDF document with extracted text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDocument {
    /// Display name (file name for uploads)
    pub name: String,
    pub pages: Vec<PdfPage>,
    pub metadata: PdfMetadata,
}

impl PdfDocument {
    /// Load a PDF document from a file path
    pub fn load(path: &Path) -> Result<Self, PdfError> {
        debug!("Loading PDF from: {}", path.display());

        let doc = LoDocument::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_lopdf(display_name(path), &doc)
    }

    /// Load a PDF document from an in-memory buffer
    pub fn load_mem(name: impl Into<String>, bytes: &[u8]) -> Result<Self, PdfError> {
        let doc = LoDocument::load_mem(bytes)?;
        Self::from_lopdf(name.into(), &doc)
    }

    fn from_lopdf(name: String, doc: &LoDocument) -> Result<Self, PdfError> {
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(PdfError::EmptyDocument);
        }

        debug!("PDF '{}' has {} pages", name, page_numbers.len());

        let metadata = Self::extract_metadata(doc, page_numbers.len() as u32);

        // BTreeMap keys come back in page order
        let pages = page_numbers
            .into_iter()
            .map(|page_num| {
                let text = doc.extract_text(&[page_num]).unwrap_or_else(|e| {
                    warn!("No text on page {} of '{}': {}", page_num, name, e);
                    String::new()
                });
                PdfPage {
                    index: page_num - 1,
                    text,
                }
            })
            .collect();

        Ok(PdfDocument {
            name,
            pages,
            metadata,
        })
    }

    fn extract_metadata(doc: &LoDocument, page_count: u32) -> PdfMetadata {
        let mut metadata = PdfMetadata {
            page_count,
            ..Default::default()
        };

        let info = doc
            .trailer
            .get(b"Info")
            .and_then(|info| info.as_reference())
            .and_then(|id| doc.get_dictionary(id));

        if let Ok(info_dict) = info {
            let field = |key: &[u8]| {
                info_dict
                    .get(key)
                    .and_then(|v| v.as_string())
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            };
            metadata.title = field(b"Title");
            metadata.author = field(b"Author");
        }

        metadata
    }

    /// All page text concatenated with `separator`
    pub fn joined_text(&self, separator: &str) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Convert into the immutable chat document
    pub fn into_document(self) -> Document {
        let page_count = self.page_count();
        let full_text = self.joined_text("");
        Document::new(self.name, full_text, page_count)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Whether a path names a PDF (by extension, case-insensitive)
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Keep at most `max` PDF paths, silently dropping anything else
pub fn select_uploads(paths: &[PathBuf], max: usize) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| is_pdf(p))
        .take(max)
        .cloned()
        .collect()
}

/// A file received from the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Only `application/pdf` counts; parameters and case are ignored
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false)
    }
}

/// Keep at most `max` uploads whose MIME type is PDF
pub fn select_files(files: Vec<Upload>, max: usize) -> Vec<Upload> {
    files.into_iter().filter(Upload::is_pdf).take(max).collect()
}

/// Extract every file concurrently, one blocking task per file.
///
/// Results keep the input order; a failure only affects its own entry.
pub async fn extract_all(paths: Vec<PathBuf>) -> Vec<(PathBuf, Result<Document, PdfError>)> {
    let tasks = paths.into_iter().map(|path| async move {
        let task_path = path.clone();
        let result = tokio::task::spawn_blocking(move || PdfDocument::load(&task_path))
            .await
            .map_err(|e| PdfError::TaskFailed(e.to_string()))
            .and_then(|r| r)
            .map(PdfDocument::into_document);
        (path, result)
    });

    join_all(tasks).await
}

/// In-memory counterpart of [`extract_all`], keyed by upload name
pub async fn extract_uploads(files: Vec<Upload>) -> Vec<(String, Result<Document, PdfError>)> {
    let tasks = files.into_iter().map(|file| async move {
        let name = file.name.clone();
        let result = tokio::task::spawn_blocking(move || PdfDocument::load_mem(file.name, &file.bytes))
            .await
            .map_err(|e| PdfError::TaskFailed(e.to_string()))
            .and_then(|r| r)
            .map(PdfDocument::into_document);
        (name, result)
    });

    join_all(tasks).await
}

/// Read a single PDF off the async runtime
pub async fn load_blocking(path: PathBuf) -> Result<PdfDocument, PdfError> {
    tokio::task::spawn_blocking(move || PdfDocument::load(&path))
        .await
        .map_err(|e| PdfError::TaskFailed(e.to_string()))?
}

//! Text extraction for the supported upload formats.
//!
//! Each submodule turns one binary format into plain text suitable for
//! chunking. Extraction is tolerant where the content is merely empty and
//! strict where the container itself is malformed.

mod docx;
mod email;
mod pdf;

use thiserror::Error;

use crate::processing::types::DocumentKind;

/// Plain text pulled out of an uploaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    /// Concatenated text content.
    pub text: String,
    /// Number of pages, for formats that have them.
    pub page_count: Option<u32>,
}

/// Errors produced while extracting text from an upload.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The PDF container could not be read.
    #[error("failed to read PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    /// The DOCX zip container could not be opened or lacks a body part.
    #[error("failed to read DOCX archive: {0}")]
    DocxArchive(#[from] zip::result::ZipError),
    /// The DOCX body XML could not be parsed.
    #[error("failed to parse DOCX body: {0}")]
    DocxBody(#[from] quick_xml::Error),
    /// The bytes could not be interpreted as an email message.
    #[error("could not parse email message")]
    Email,
    /// Reading an archive entry failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Extract plain text from `bytes` according to the document kind.
pub fn extract(kind: DocumentKind, bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
    match kind {
        DocumentKind::Pdf => pdf::extract(bytes),
        DocumentKind::Docx => docx::extract(bytes),
        DocumentKind::Email => email::extract(bytes),
    }
}

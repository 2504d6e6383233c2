use lopdf::Document;

use super::{ExtractError, ExtractedText};

/// Extract text from every page of a PDF, joined with newlines.
///
/// Pages whose content streams cannot be decoded are skipped rather than
/// failing the whole document.
pub(super) fn extract(bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
    let document = Document::load_mem(bytes)?;
    let pages = document.get_pages();
    let page_count = pages.len() as u32;

    let mut text = String::new();
    let mut unreadable = 0usize;
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                let trimmed = page_text.trim();
                if !trimmed.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(trimmed);
                }
            }
            Err(err) => {
                unreadable += 1;
                tracing::warn!(page = *page_number, error = %err, "Skipping unreadable PDF page");
            }
        }
    }

    tracing::debug!(
        page_count,
        unreadable,
        characters = text.chars().count(),
        "Extracted PDF text"
    );
    Ok(ExtractedText {
        text,
        page_count: Some(page_count),
    })
}

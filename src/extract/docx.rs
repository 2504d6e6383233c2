use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::{ExtractError, ExtractedText};

/// Extract paragraph text from a DOCX upload.
///
/// A DOCX file is a zip archive whose `word/document.xml` part holds the
/// body. Text lives in `w:t` runs grouped into `w:p` paragraphs; runs are
/// concatenated per paragraph and empty paragraphs are dropped.
pub(super) fn extract(bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut buf = Vec::new();
    let mut in_text_run = false;
    let mut paragraph = String::new();
    let mut paragraphs: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                if e.name().as_ref() == b"w:t" {
                    in_text_run = true;
                }
            }
            Event::Text(e) => {
                if in_text_run {
                    paragraph.push_str(&e.unescape()?);
                }
            }
            Event::Empty(ref e) => match e.name().as_ref() {
                b"w:tab" => paragraph.push('\t'),
                b"w:br" => paragraph.push('\n'),
                _ => {}
            },
            Event::End(ref e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    let trimmed = paragraph.trim();
                    if !trimmed.is_empty() {
                        paragraphs.push(trimmed.to_string());
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!(paragraphs = paragraphs.len(), "Extracted DOCX text");
    Ok(ExtractedText {
        text: paragraphs.join("\n"),
        page_count: None,
    })
}

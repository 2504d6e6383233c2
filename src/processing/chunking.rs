//! Character-budget chunking helpers.
//!
//! Documents are split into segments that fit a fixed character budget, then
//! a trailing window of the previous chunk is carried into each subsequent
//! chunk so that spans around boundaries remain visible to retrieval. The
//! splitter respects separator hierarchy (paragraphs, then sentences, then
//! words) before falling back to hard character splits.

use semchunk_rs::Chunker;
use sha2::{Digest, Sha256};

use super::types::ChunkingError;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// - `max_chars` is a hard upper bound on the character count per chunk.
/// - `overlap` characters from the tail of the previous chunk are prepended
///   to each subsequent chunk; the combined chunk is trimmed back into the
///   budget from the front, so the newest content always survives.
///
/// Returns an empty vector when the input text is all whitespace.
pub(crate) fn chunk_text(
    text: &str,
    max_chars: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if max_chars == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunker = Chunker::new(
        max_chars,
        Box::new(|segment: &str| segment.chars().count()),
    );
    let base_chunks = chunker.chunk(text);
    Ok(apply_overlap(base_chunks, max_chars, overlap))
}

/// Compute a deterministic SHA-256 digest for chunk text.
pub(crate) fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn apply_overlap(chunks: Vec<String>, max_chars: usize, overlap: usize) -> Vec<String> {
    if chunks.is_empty() {
        return chunks;
    }

    let effective_overlap = overlap.min(max_chars.saturating_sub(1));
    if effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter();
    let mut previous = iter
        .next()
        .expect("chunks iterator yielded zero elements despite non-empty guard");
    overlapped.push(previous.clone());

    for current in iter {
        let tail = char_tail(&previous, effective_overlap);
        let mut combined = String::with_capacity(tail.len() + current.len() + 1);
        if !tail.is_empty() {
            combined.push_str(tail);
            if !tail.ends_with(char::is_whitespace) && !current.starts_with(char::is_whitespace) {
                combined.push(' ');
            }
        }
        combined.push_str(&current);
        overlapped.push(trim_to_char_budget(combined, max_chars));
        previous = current;
    }

    overlapped
}

/// Last `limit` characters of `text`, with leading whitespace dropped.
fn char_tail(text: &str, limit: usize) -> &str {
    let char_count = text.chars().count();
    if char_count <= limit {
        return text.trim_start();
    }
    let start = text
        .char_indices()
        .nth(char_count - limit)
        .map(|(index, _)| index)
        .unwrap_or(0);
    text[start..].trim_start()
}

/// Drop characters from the front until `text` fits the budget.
fn trim_to_char_budget(text: String, budget: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= budget {
        return text;
    }
    let start = text
        .char_indices()
        .nth(char_count - budget)
        .map(|(index, _)| index)
        .unwrap_or(0);
    text[start..].trim_start().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_the_character_budget() {
        let text = "The quick brown fox jumps over the lazy dog and keeps running.";
        let chunks = chunk_text(text, 12, 0).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 12, "oversized chunk: {chunk:?}");
        }
        let chunk_words: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| chunk.split_whitespace())
            .collect();
        let original_words: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(chunk_words, original_words);
    }

    #[test]
    fn whitespace_input_produces_no_chunks() {
        assert!(chunk_text("   \n\t  ", 100, 10).unwrap().is_empty());
        assert!(chunk_text("", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let error = chunk_text("hello", 0, 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn overlap_prepends_previous_tail() {
        let chunks = apply_overlap(
            vec!["alpha beta".to_string(), "gamma delta".to_string()],
            40,
            4,
        );
        assert_eq!(chunks, vec!["alpha beta", "beta gamma delta"]);
    }

    #[test]
    fn overlapped_chunks_never_exceed_the_budget() {
        let chunks = apply_overlap(vec!["abcdef".to_string(), "ghijkl".to_string()], 6, 2);
        assert_eq!(chunks[0], "abcdef");
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 6);
        }
        assert!(chunks[1].ends_with("ghijkl"));
    }

    #[test]
    fn overlap_is_capped_below_the_budget() {
        let chunks = apply_overlap(vec!["aaaa".to_string(), "bbbb".to_string()], 4, 10);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 4);
        }
    }

    #[test]
    fn chunk_hash_is_stable_and_distinct() {
        assert_eq!(compute_chunk_hash("hello"), compute_chunk_hash("hello"));
        assert_ne!(compute_chunk_hash("hello"), compute_chunk_hash("world"));
        assert_eq!(compute_chunk_hash("hello").len(), 64);
    }
}

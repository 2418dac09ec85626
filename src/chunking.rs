//! Fixed-size text chunking.
//!
//! Splits a document into contiguous, non-overlapping segments of exactly
//! `size` characters; the final segment holds the remainder. Segments are
//! not boundary-aware and may split mid-word.

use crate::error::ChunkingError;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Splits `text` into segments of `size` characters.
///
/// Characters are Unicode scalar values, so a segment never ends inside a
/// multi-byte code point. The returned slices borrow from `text` and
/// concatenate back to it exactly.
///
/// # Errors
///
/// Returns [`ChunkingError::ZeroSize`] if `size` is zero.
///
/// # Examples
///
/// ```
/// use script_lens::chunking::chunk_text;
///
/// let chunks = chunk_text("abcdefg", 3).unwrap_or_default();
/// assert_eq!(chunks, vec!["abc", "def", "g"]);
/// ```
pub fn chunk_text(text: &str, size: usize) -> Result<Vec<&str>, ChunkingError> {
    if size == 0 {
        return Err(ChunkingError::ZeroSize);
    }

    let mut chunks = Vec::with_capacity(text.len() / size + 1);
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    Ok(chunks)
}

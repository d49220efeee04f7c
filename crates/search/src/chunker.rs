//! Text chunking with configurable size and overlap.

use minutes_core::{AppError, AppResult};

/// A window of the source text.
///
/// Offsets are character (not byte) positions into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of the chunk within the source text
    pub position: usize,

    /// First character offset (inclusive)
    pub start: usize,

    /// Last character offset (exclusive)
    pub end: usize,

    pub text: String,
}

/// Reject window parameters that would never advance.
pub fn validate_window(chunk_size: usize, overlap: usize) -> AppResult<()> {
    if chunk_size == 0 {
        return Err(AppError::InvalidConfiguration(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(AppError::InvalidConfiguration(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Chunk text into overlapping character windows.
///
/// Text no longer than `chunk_size` characters comes back as a single chunk
/// (the empty string included). Longer text is covered by windows of
/// `chunk_size` characters that advance by `chunk_size - overlap`; the last
/// window may be shorter.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<TextChunk>> {
    validate_window(chunk_size, overlap)?;

    // Byte offset of every char boundary, plus the end of the string
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    if char_count <= chunk_size {
        return Ok(vec![TextChunk {
            position: 0,
            start: 0,
            end: char_count,
            text: text.to_string(),
        }]);
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::with_capacity(char_count / step + 1);
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(char_count);
        chunks.push(TextChunk {
            position: chunks.len(),
            start,
            end,
            text: text[boundaries[start]..boundaries[end]].to_string(),
        });

        if end >= char_count {
            break;
        }
        start += step;
    }

    tracing::debug!(
        "Chunked {} chars into {} chunks (size: {}, overlap: {})",
        char_count,
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}

//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and its fixed-window
//! implementation, [`FixedSizeChunker`]. Chunk boundaries are a pure
//! function of the input text and the chunker parameters, so repeated
//! ingestion of the same document always yields identical chunks.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and offsets but no
/// embeddings; embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document text is empty or
    /// whitespace-only.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size overlapping windows by character count.
///
/// Windows start at character offsets `0, size-overlap, 2*(size-overlap), …`
/// until the window start reaches the end of the text. The final window may
/// be shorter than `size`; it is right-trimmed and dropped if nothing
/// remains after trimming. Chunk IDs are generated as
/// `{document_id}_{chunk_index}`.
///
/// Stored offsets are byte offsets into the document text, so windows
/// never split a UTF-8 code point and callers can slice the original text
/// directly.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    size: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `size` — window width in characters, must be greater than zero
    /// * `overlap` — characters shared by consecutive windows, must be
    ///   strictly less than `size`
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameter`] if the constraints are
    /// violated.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(RagError::InvalidParameter(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= size {
            return Err(RagError::InvalidParameter(format!(
                "chunk overlap ({overlap}) must be less than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    /// The configured window width in characters.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The configured overlap width in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every character boundary, plus the end of the text.
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_count = bounds.len();
        let byte_at = |char_idx: usize| -> usize {
            if char_idx >= char_count { text.len() } else { bounds[char_idx] }
        };

        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut chunk_index = 0;

        while start < char_count {
            let end = (start + self.size).min(char_count);
            let byte_start = byte_at(start);
            let mut byte_end = byte_at(end);
            let mut chunk_text = &text[byte_start..byte_end];

            // The final window may trail off into whitespace.
            if end == char_count {
                chunk_text = chunk_text.trim_end();
                byte_end = byte_start + chunk_text.len();
            }

            if !chunk_text.is_empty() {
                chunks.push(Chunk {
                    id: format!("{}_{chunk_index}", document.id),
                    document_id: document.id.clone(),
                    text: chunk_text.to_string(),
                    start_offset: byte_start,
                    end_offset: byte_end,
                });
                chunk_index += 1;
            }

            start += step;
        }

        chunks
    }
}

//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! splits text into overlapping windows of a fixed number of characters.

use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations must be deterministic: the same document and configuration
/// always yield the same chunk boundaries, which is what makes re-ingestion
/// idempotent.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks, tagging each with `source = document.id`.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with overlap.
///
/// Windows of `chunk_size` characters advance by `chunk_size - chunk_overlap`.
/// The final window ends exactly at the end of the text and may be shorter;
/// every pair of consecutive chunks shares exactly `chunk_overlap` characters.
/// Offsets and lengths count Unicode scalar values, so multi-byte text is
/// never split inside a code point.
///
/// # Example
///
/// ```rust,ignore
/// use ground_rag::{Document, FixedSizeChunker, Chunker};
///
/// let chunker = FixedSizeChunker::new(500, 100)?;
/// let chunks = chunker.chunk(&Document::new("a.txt", "The sky is blue."));
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - number of characters per chunk
    /// * `chunk_overlap` - number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunker requires chunk_size > chunk_overlap (got {chunk_size} and {chunk_overlap})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        if text.is_empty() {
            return Vec::new();
        }

        // Byte position of every char boundary, including the end of the text.
        let boundaries: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_count = boundaries.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::with_capacity(char_count.div_ceil(step));
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            let chunk_text = &text[boundaries[start]..boundaries[end]];
            chunks.push(Chunk::new(document.id.as_str(), start, chunk_text));
            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }
}

//! Data types for documents, chunks, indexed vectors and answers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A source document: raw text plus a unique identifier (its file name).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
}

impl Document {
    /// Create a document from an identifier and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }

    /// SHA-256 of the text, hex encoded.
    ///
    /// Stored next to the index so unchanged documents are not re-embedded.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A contiguous segment of a [`Document`]'s text with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Identifier of the form `{source}#{offset}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The ID of the parent [`Document`].
    pub source: String,
    /// Character position of the chunk's first character within the source.
    pub offset: usize,
    /// Number of characters in `text`.
    pub length: usize,
}

impl Chunk {
    /// Create a chunk, deriving its id and length.
    pub fn new(source: impl Into<String>, offset: usize, text: impl Into<String>) -> Self {
        let source = source.into();
        let text = text.into();
        Self {
            id: format!("{source}#{offset}"),
            length: text.chars().count(),
            text,
            source,
            offset,
        }
    }

    /// The `(source, offset)` identity used for idempotent indexing.
    pub fn key(&self) -> (&str, usize) {
        (&self.source, self.offset)
    }
}

/// A [`Chunk`] paired with its embedding vector. Owned by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedVector {
    /// The embedded chunk.
    pub chunk: Chunk,
    /// The vector embedding of the chunk's text.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// Ranked supporting passages for one query, ordered by descending score.
///
/// Constructed per query and never persisted. An empty result is valid and
/// means "no context".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    results: Vec<SearchResult>,
}

impl RetrievalResult {
    /// Wrap results that are already sorted by descending score.
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self { results }
    }

    /// An empty retrieval.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The ranked results.
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Iterate over the retrieved chunks in rank order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.results.iter().map(|r| &r.chunk)
    }

    /// Number of retrieved chunks.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the result, returning the ranked entries.
    pub fn into_results(self) -> Vec<SearchResult> {
        self.results
    }
}

/// A generated answer plus the chunks that were supplied as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The generated text.
    pub text: String,
    /// The chunks the model was given, in rank order.
    pub chunks: Vec<Chunk>,
}

impl Answer {
    /// Distinct source ids of the context chunks, in order of first appearance.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for chunk in &self.chunks {
            if !sources.contains(&chunk.source.as_str()) {
                sources.push(&chunk.source);
            }
        }
        sources
    }
}

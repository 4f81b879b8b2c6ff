//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::document::{Chunk, IndexedVector, SearchResult};
use crate::error::Result;

/// The settings an index was built under.
///
/// Stored chunks and vectors are only reusable when the chunking parameters
/// and the embedding model are the same as those of the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFingerprint {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
}

impl IndexFingerprint {
    /// Fingerprint of an index built with `config` and the given embedding model.
    pub fn new(config: &RagConfig, embedding_model: impl Into<String>) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            embedding_model: embedding_model.into(),
        }
    }
}

/// A storage backend for embedded chunks with similarity search.
///
/// Entries are keyed by their chunk's `(source, offset)` identity: upserting an
/// identity that is already stored replaces the entry and never creates a
/// duplicate. Alongside the vectors the store keeps one content hash per
/// source document so the pipeline can skip documents that did not change.
///
/// # Example
///
/// ```rust,ignore
/// use ground_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::open(".rag_index")?;
/// store.upsert(&entries).await?;
/// let results = store.search(&query_embedding, 3).await?;
/// store.persist().await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace entries, keyed by `(source, offset)`.
    ///
    /// The whole batch is rejected with
    /// [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch),
    /// and nothing is written, if any entry's dimension differs from the index.
    async fn upsert(&self, entries: &[IndexedVector]) -> Result<()>;

    /// Insert or replace a single chunk with its vector.
    async fn add(&self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        self.upsert(&[IndexedVector { chunk, embedding }]).await
    }

    /// Delete every entry of a source document, along with its recorded hash.
    ///
    /// Returns the number of entries removed.
    async fn delete_source(&self, source: &str) -> Result<usize>;

    /// Search for the `top_k` most similar entries to the given embedding.
    ///
    /// Returns at most `top_k` results ordered by descending similarity; equal
    /// scores keep insertion order. An empty store yields an empty `Vec`.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored entries.
    async fn len(&self) -> usize;

    /// Dimension of the stored vectors, `None` while the index is empty.
    async fn dimensions(&self) -> Option<usize>;

    /// Whether the store holds no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove all entries, recorded hashes and the fingerprint.
    async fn clear(&self) -> Result<()>;

    /// The content hash recorded for a source, if any.
    async fn source_hash(&self, source: &str) -> Option<String>;

    /// Record the content hash of a source document.
    async fn record_source(&self, source: &str, content_hash: &str) -> Result<()>;

    /// IDs of all sources with a recorded hash, sorted.
    async fn sources(&self) -> Vec<String>;

    /// Settings the stored entries were built under, if recorded.
    async fn fingerprint(&self) -> Option<IndexFingerprint>;

    /// Record the settings the stored entries were built under.
    async fn set_fingerprint(&self, fingerprint: IndexFingerprint) -> Result<()>;

    /// Write the current state to the backing storage.
    ///
    /// Stores without backing storage treat this as a no-op.
    async fn persist(&self) -> Result<()>;
}

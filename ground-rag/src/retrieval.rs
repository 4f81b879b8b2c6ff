//! Query-time retrieval over the vector index.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::{RetrievalResult, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::VectorStore;

/// Wraps a [`VectorStore`] with a fixed retrieval policy.
///
/// Embeds the query once, asks the store for the `top_k` nearest chunks and
/// drops anything scoring below `min_score`. Embedding failures are returned
/// as-is and never retried.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    /// Create a retriever returning at most `top_k` chunks scoring at least `min_score`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
        min_score: f32,
    ) -> Self {
        Self { embedder, store, top_k, min_score }
    }

    /// The configured number of chunks per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve ranked supporting passages using the configured `top_k`.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve_k(query, self.top_k).await
    }

    /// Retrieve at most `k` ranked supporting passages.
    ///
    /// An empty result is valid: nothing is stored yet, or nothing passed the
    /// score threshold.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let embedding = self.embedder.embed(query).await.inspect_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "query embedding failed");
        })?;

        let results = self.store.search(&embedding, k).await?;
        let threshold = self.min_score;
        let filtered: Vec<SearchResult> =
            results.into_iter().filter(|r| r.score >= threshold).collect();

        debug!(k, result_count = filtered.len(), "retrieved context");
        Ok(RetrievalResult::new(filtered))
    }
}

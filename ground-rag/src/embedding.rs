//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that maps text to a fixed-dimensionality vector.
///
/// The embedding model itself is an external service; implementations wrap a
/// concrete backend (Ollama, a test double, ...) behind one async call. The
/// default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially.
///
/// Failures must be reported as
/// [`RagError::EmbeddingFailed`](crate::RagError::EmbeddingFailed) and are
/// never retried by callers.
///
/// # Example
///
/// ```rust,ignore
/// use ground_rag::EmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new(OllamaConfig::default())?;
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Short provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Identity of the model producing the vectors.
    ///
    /// Vectors from different models are never compared: an index built
    /// under another `model_id` is re-embedded from scratch.
    fn model_id(&self) -> String {
        self.name().to_string()
    }
}

//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] composes the build phase (chunk → embed → store) and
//! the query phase (retrieve → generate). The build phase must complete
//! successfully before any question is answered.
//!
//! # Example
//!
//! ```rust,ignore
//! use ground_rag::{FileVectorStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(FileVectorStore::open(".rag_index")?))
//!     .language_model(Arc::new(llm))
//!     .build()?;
//!
//! let report = pipeline.ingest_dir("data", "txt").await?;
//! let answer = pipeline.answer("What color is the sky?").await?;
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::corpus::load_corpus;
use crate::document::{Answer, Document, IndexedVector, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{AnswerGenerator, LanguageModel};
use crate::retrieval::Retriever;
use crate::vectorstore::{IndexFingerprint, VectorStore};

/// Lifecycle of a [`RagPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// The index has not been built yet; questions are refused.
    Building,
    /// The index is built; questions can be answered.
    Ready,
}

/// Outcome of a build phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Eligible (non-blank) documents in the corpus.
    pub documents: usize,
    /// Documents whose content changed or that were new, and got re-embedded.
    pub documents_embedded: usize,
    /// Documents skipped because their content hash was unchanged.
    pub documents_skipped: usize,
    /// Chunks embedded during this run.
    pub chunks_embedded: usize,
    /// Sources removed from the index because they left the corpus.
    pub sources_pruned: usize,
    /// Chunks held by the index after the run.
    pub total_chunks: usize,
}

/// A changed document with its freshly embedded chunks, not yet stored.
struct PendingDocument<'a> {
    document: &'a Document,
    content_hash: String,
    entries: Vec<IndexedVector>,
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`]. After the build phase the
/// pipeline holds no per-query mutable state; each call to
/// [`answer`](RagPipeline::answer) is independent.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    retriever: Retriever,
    generator: AnswerGenerator,
    ready: AtomicBool,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> PipelinePhase {
        if self.ready.load(Ordering::Acquire) {
            PipelinePhase::Ready
        } else {
            PipelinePhase::Building
        }
    }

    /// Build phase over the `*.{extension}` files directly under `dir`.
    ///
    /// # Errors
    ///
    /// - [`RagError::SourceNotFound`] if `dir` does not exist
    /// - [`RagError::EmptyCorpus`] if it holds no non-blank matching file
    /// - anything [`ingest`](RagPipeline::ingest) returns
    pub async fn ingest_dir(&self, dir: impl AsRef<Path>, extension: &str) -> Result<IngestReport> {
        let dir = dir.as_ref();
        let documents = load_corpus(dir, extension)?;
        self.ingest_from(&dir.display().to_string(), &documents).await
    }

    /// Build phase over an in-memory document collection.
    ///
    /// Re-ingestion policy: documents whose content hash matches the one
    /// recorded in the index are skipped; changed documents have their old
    /// chunks deleted and their new chunks upserted; sources no longer in the
    /// collection are pruned. Stored hashes only count while the index
    /// [`IndexFingerprint`] (chunk size, overlap and embedding model) matches
    /// the current run; otherwise every document is re-embedded and the old
    /// entries are replaced. Every chunk is embedded and checked before the
    /// index is touched, so an embedding failure leaves the index unchanged.
    /// On success the index is persisted and the pipeline becomes
    /// [`Ready`](PipelinePhase::Ready).
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if no document has non-blank text
    /// - [`RagError::Config`] if two documents share an id
    /// - [`RagError::EmbeddingFailed`] if any chunk cannot be embedded
    /// - [`RagError::DimensionMismatch`] if the new vectors do not fit the index
    /// - [`RagError::IndexUnavailable`] if the index cannot be persisted
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
        self.ingest_from("the supplied documents", documents).await
    }

    /// Run the build phase from scratch, replacing every stored entry.
    ///
    /// The old entries are dropped only once all documents are embedded.
    pub async fn rebuild(&self, documents: &[Document]) -> Result<IngestReport> {
        self.rebuild_from("the supplied documents", documents).await
    }

    /// [`rebuild`](RagPipeline::rebuild) over a directory.
    pub async fn rebuild_dir(&self, dir: impl AsRef<Path>, extension: &str) -> Result<IngestReport> {
        let dir = dir.as_ref();
        let documents = load_corpus(dir, extension)?;
        self.rebuild_from(&dir.display().to_string(), &documents).await
    }

    /// [`rebuild`](RagPipeline::rebuild) for documents loaded from `location`,
    /// which names the corpus in errors.
    pub async fn rebuild_from(&self, location: &str, documents: &[Document]) -> Result<IngestReport> {
        self.build_index(location, documents, true).await
    }

    /// [`ingest`](RagPipeline::ingest) for documents loaded from `location`,
    /// which names the corpus in errors.
    pub async fn ingest_from(&self, location: &str, documents: &[Document]) -> Result<IngestReport> {
        self.build_index(location, documents, false).await
    }

    async fn build_index(
        &self,
        location: &str,
        documents: &[Document],
        rebuild: bool,
    ) -> Result<IngestReport> {
        let eligible = eligible_documents(location, documents)?;

        let fingerprint = IndexFingerprint::new(&self.config, self.embedding_provider.model_id());
        let reusable = !rebuild
            && match self.vector_store.fingerprint().await {
                Some(stored) => stored == fingerprint,
                None => self.vector_store.is_empty().await,
            };
        if !reusable && !rebuild {
            warn!(
                embedding_model = %fingerprint.embedding_model,
                chunk_size = fingerprint.chunk_size,
                chunk_overlap = fingerprint.chunk_overlap,
                "index was built with other settings, re-embedding every document"
            );
        }

        let mut report = IngestReport { documents: eligible.len(), ..IngestReport::default() };
        let mut pending = Vec::new();
        for &document in &eligible {
            let content_hash = document.content_hash();
            if reusable {
                let stored_hash = self.vector_store.source_hash(&document.id).await;
                if stored_hash.as_deref() == Some(content_hash.as_str()) {
                    report.documents_skipped += 1;
                    continue;
                }
            }
            let entries = self.embed_document(document).await?;
            pending.push(PendingDocument { document, content_hash, entries });
        }

        let stored_dimensions =
            if reusable { self.vector_store.dimensions().await } else { None };
        check_dimensions(stored_dimensions, &pending)?;

        let current: HashSet<&str> = eligible.iter().map(|d| d.id.as_str()).collect();
        let stale: Vec<String> = self
            .vector_store
            .sources()
            .await
            .into_iter()
            .filter(|source| !current.contains(source.as_str()))
            .collect();

        if !reusable {
            self.vector_store.clear().await?;
        }
        for PendingDocument { document, content_hash, entries } in pending {
            self.vector_store.delete_source(&document.id).await?;
            self.vector_store.upsert(&entries).await?;
            self.vector_store.record_source(&document.id, &content_hash).await?;
            report.documents_embedded += 1;
            report.chunks_embedded += entries.len();
            info!(document.id = %document.id, chunk_count = entries.len(), "ingested document");
        }
        for source in &stale {
            let removed = self.vector_store.delete_source(source).await?;
            info!(document.id = %source, chunk_count = removed, "pruned document");
        }
        report.sources_pruned = stale.len();
        self.vector_store.set_fingerprint(fingerprint).await?;

        self.vector_store.persist().await.inspect_err(|e| {
            error!(error = %e, "failed to persist vector index");
        })?;

        report.total_chunks = self.vector_store.len().await;
        self.ready.store(true, Ordering::Release);
        info!(
            documents = report.documents,
            skipped = report.documents_skipped,
            chunks = report.total_chunks,
            "build phase complete"
        );
        Ok(report)
    }

    async fn embed_document(&self, document: &Document) -> Result<Vec<IndexedVector>> {
        let chunks = self.chunker.chunk(document);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        let embeddings = self.embedding_provider.embed_batch(&texts).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingFailed {
                provider: self.embedding_provider.name().to_string(),
                message: format!(
                    "expected {} embeddings for document '{}', got {}",
                    chunks.len(),
                    document.id,
                    embeddings.len()
                ),
            });
        }

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedVector { chunk, embedding })
            .collect())
    }

    /// Retrieve the ranked supporting passages for a question.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] before the build phase has completed, or
    /// [`RagError::EmbeddingFailed`] if the question cannot be embedded.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        self.ensure_ready()?;
        self.retriever.retrieve(question).await
    }

    /// Query phase: retrieve context, then generate a grounded answer.
    ///
    /// An empty retrieval still produces an answer; the model is told that no
    /// context was found.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotReady`] before the build phase has completed
    /// - [`RagError::EmbeddingFailed`] if the question cannot be embedded
    /// - [`RagError::GenerationUnavailable`] if the language model fails
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let retrieval = self.retrieve(question).await?;
        info!(result_count = retrieval.len(), "retrieval completed");
        self.generator.generate(question, &retrieval).await
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.phase() {
            PipelinePhase::Ready => Ok(()),
            PipelinePhase::Building => Err(RagError::NotReady),
        }
    }
}

/// Documents with non-blank text, refusing an empty collection and duplicate ids.
fn eligible_documents<'a>(location: &str, documents: &'a [Document]) -> Result<Vec<&'a Document>> {
    let eligible: Vec<&Document> =
        documents.iter().filter(|d| !d.text.trim().is_empty()).collect();
    if eligible.is_empty() {
        return Err(RagError::EmptyCorpus { location: location.to_string() });
    }

    let mut seen = HashSet::new();
    for document in &eligible {
        if !seen.insert(document.id.as_str()) {
            return Err(RagError::Config(format!("duplicate document id '{}'", document.id)));
        }
    }
    Ok(eligible)
}

/// Every pending vector must have one dimension, equal to `stored` when the
/// index keeps entries from earlier runs.
fn check_dimensions(stored: Option<usize>, pending: &[PendingDocument<'_>]) -> Result<()> {
    let mut dimension = stored;
    for actual in pending.iter().flat_map(|p| &p.entries).map(|e| e.embedding.len()) {
        match dimension {
            Some(expected) if expected != actual => {
                return Err(RagError::DimensionMismatch { expected, actual });
            }
            Some(_) => {}
            None => dimension = Some(actual),
        }
    }
    Ok(())
}

/// Builder for constructing a [`RagPipeline`].
///
/// The chunker defaults to a [`FixedSizeChunker`] built from the config; all
/// other fields are required. Call [`build()`](RagPipelineBuilder::build) to
/// validate and produce the pipeline.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    language_model: Option<Arc<dyn LanguageModel>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the language model used for answer generation.
    pub fn language_model(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(llm);
        self
    }

    /// Build the [`RagPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing or the
    /// configuration is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let language_model = self
            .language_model
            .ok_or_else(|| RagError::Config("language_model is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::from_config(&config)?),
        };

        let retriever = Retriever::new(
            Arc::clone(&embedding_provider),
            Arc::clone(&vector_store),
            config.top_k,
            config.similarity_threshold,
        );
        let generator = AnswerGenerator::new(language_model);

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            retriever,
            generator,
            ready: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filestore::FileVectorStore;
    use crate::mock::{MockEmbeddingProvider, MockLanguageModel};

    fn pipeline(embedder: Arc<MockEmbeddingProvider>) -> RagPipeline {
        RagPipeline::builder()
            .config(RagConfig::builder().chunk_size(20).chunk_overlap(5).build().unwrap())
            .embedding_provider(embedder)
            .vector_store(Arc::new(FileVectorStore::in_memory()))
            .language_model(Arc::new(MockLanguageModel::new("ok")))
            .build()
            .unwrap()
    }

    /// Two-dimensional vectors, except for texts mentioning "wide".
    struct UnevenEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for UnevenEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(if text.contains("wide") { vec![1.0, 0.0, 0.0] } else { vec![1.0, 0.0] })
        }

        fn name(&self) -> &str {
            "Uneven"
        }
    }

    #[test]
    fn builder_requires_language_model() {
        let result = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(MockEmbeddingProvider::new(8)))
            .vector_store(Arc::new(FileVectorStore::in_memory()))
            .build();
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[tokio::test]
    async fn answer_before_build_is_refused() {
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(8)));
        assert_eq!(pipeline.phase(), PipelinePhase::Building);
        assert!(matches!(pipeline.answer("q").await, Err(RagError::NotReady)));
    }

    #[tokio::test]
    async fn unchanged_documents_are_not_re_embedded() {
        let embedder = Arc::new(MockEmbeddingProvider::new(32));
        let pipeline = pipeline(Arc::clone(&embedder));
        let docs = vec![Document::new("a.txt", "The sky is blue. Grass is green.")];

        let first = pipeline.ingest(&docs).await.unwrap();
        let calls_after_first = embedder.calls();
        let second = pipeline.ingest(&docs).await.unwrap();

        assert_eq!(first.documents_embedded, 1);
        assert_eq!(second.documents_embedded, 0);
        assert_eq!(second.documents_skipped, 1);
        assert_eq!(second.total_chunks, first.total_chunks);
        assert_eq!(embedder.calls(), calls_after_first);
    }

    #[tokio::test]
    async fn changed_document_replaces_its_chunks() {
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(32)));
        pipeline.ingest(&[Document::new("a.txt", "a".repeat(50))]).await.unwrap();
        let report = pipeline.ingest(&[Document::new("a.txt", "b".repeat(10))]).await.unwrap();
        assert_eq!(report.documents_embedded, 1);
        assert_eq!(report.total_chunks, 1);
    }

    #[tokio::test]
    async fn removed_documents_are_pruned() {
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(32)));
        pipeline
            .ingest(&[Document::new("a.txt", "alpha"), Document::new("b.txt", "beta")])
            .await
            .unwrap();
        let report = pipeline.ingest(&[Document::new("a.txt", "alpha")]).await.unwrap();
        assert_eq!(report.sources_pruned, 1);
        assert_eq!(report.total_chunks, 1);
        assert_eq!(pipeline.vector_store().sources().await, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn mismatched_dimensions_leave_the_index_intact() {
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(UnevenEmbedder))
            .vector_store(Arc::new(FileVectorStore::in_memory()))
            .language_model(Arc::new(MockLanguageModel::new("ok")))
            .build()
            .unwrap();
        let docs = [Document::new("a.txt", "alpha"), Document::new("b.txt", "beta")];
        pipeline.ingest(&docs).await.unwrap();
        let stored_hash = pipeline.vector_store().source_hash("b.txt").await;

        let changed = [Document::new("a.txt", "alpha"), Document::new("b.txt", "beta wide")];
        let err = pipeline.ingest(&changed).await.unwrap_err();

        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(pipeline.vector_store().len().await, 2);
        assert_eq!(pipeline.vector_store().source_hash("b.txt").await, stored_hash);
        assert_eq!(pipeline.retrieve("beta").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(8)));
        let docs = [Document::new("a.txt", "x"), Document::new("a.txt", "y")];
        assert!(matches!(pipeline.ingest(&docs).await, Err(RagError::Config(_))));
    }

    #[tokio::test]
    async fn blank_documents_are_not_eligible() {
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(8)));
        let err = pipeline.ingest(&[Document::new("a.txt", "  \n ")]).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyCorpus { .. }));
        assert_eq!(pipeline.phase(), PipelinePhase::Building);
    }

    #[tokio::test]
    async fn rebuild_re_embeds_everything() {
        let embedder = Arc::new(MockEmbeddingProvider::new(32));
        let pipeline = pipeline(Arc::clone(&embedder));
        let docs = vec![Document::new("a.txt", "alpha")];
        pipeline.ingest(&docs).await.unwrap();
        let report = pipeline.rebuild(&docs).await.unwrap();
        assert_eq!(report.documents_embedded, 1);
        assert_eq!(report.documents_skipped, 0);
        assert_eq!(embedder.calls(), 2);
    }
}

//! # ground-rag
//!
//! A local retrieval-augmented generation pipeline whose answers are grounded
//! only in retrieved text.
//!
//! ## Overview
//!
//! - [`FixedSizeChunker`] splits documents into overlapping, provenance-tagged chunks
//! - [`FileVectorStore`] indexes embedded chunks and persists them to a directory
//! - [`Retriever`] embeds a question and returns the top-k chunks
//! - [`AnswerGenerator`] asks a [`LanguageModel`] to answer from those chunks only
//! - [`RagPipeline`] wires the build phase and the query phase together
//!
//! The embedding model and the language model are external services behind
//! the [`EmbeddingProvider`] and [`LanguageModel`] traits. With the `ollama`
//! feature (on by default) the [`ollama`] module provides both for a local
//! Ollama server.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ground_rag::ollama::{OllamaChatModel, OllamaConfig, OllamaEmbeddingProvider};
//! use ground_rag::{FileVectorStore, RagConfig, RagPipeline};
//!
//! let ollama = OllamaConfig::default();
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(OllamaEmbeddingProvider::new(ollama.clone())))
//!     .vector_store(Arc::new(FileVectorStore::open(".rag_index")?))
//!     .language_model(Arc::new(OllamaChatModel::new(ollama)))
//!     .build()?;
//!
//! pipeline.ingest_dir("data", "txt").await?;
//! let answer = pipeline.answer("What color is the sky?").await?;
//! println!("Answer: {}", answer.text);
//! ```

pub mod chunking;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filestore;
pub mod generation;
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod pipeline;
pub mod retrieval;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use corpus::{DEFAULT_EXTENSION, load_corpus};
pub use document::{Answer, Chunk, Document, IndexedVector, RetrievalResult, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filestore::FileVectorStore;
pub use generation::{
    AnswerGenerator, GROUNDING_INSTRUCTION, LanguageModel, NO_CONTEXT_MARKER, Prompt, build_prompt,
};
pub use pipeline::{IngestReport, PipelinePhase, RagPipeline, RagPipelineBuilder};
pub use retrieval::Retriever;
pub use vectorstore::{IndexFingerprint, VectorStore};

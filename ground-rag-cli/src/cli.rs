//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::Parser;
use ground_rag::ollama::{
    DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL, OllamaConfig,
};
use ground_rag::{DEFAULT_EXTENSION, RagConfig, Result};

/// Ask questions about a folder of text files, answered only from their content.
///
/// Every option can also be set through the environment variable shown in
/// `--help`; a `.env` file in the working directory is loaded first.
#[derive(Debug, Clone, Parser)]
#[command(name = "ground-rag", version, about, long_about = None)]
pub struct Cli {
    /// Folder holding the documents to index
    #[arg(long, env = "GROUND_RAG_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Folder where the vector index is persisted
    #[arg(long, env = "GROUND_RAG_INDEX_DIR", default_value = ".rag_index")]
    pub index_dir: PathBuf,

    /// Extension of the files to index
    #[arg(long, env = "GROUND_RAG_EXTENSION", default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Characters per chunk
    #[arg(long, env = "GROUND_RAG_CHUNK_SIZE", default_value_t = 500)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "GROUND_RAG_CHUNK_OVERLAP", default_value_t = 100)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(short = 'k', long, env = "GROUND_RAG_TOP_K", default_value_t = 3)]
    pub top_k: usize,

    /// Minimum similarity for a chunk to be used as context
    #[arg(long, env = "GROUND_RAG_MIN_SCORE", default_value_t = 0.0)]
    pub min_score: f32,

    /// Ollama embedding model
    #[arg(long, env = "GROUND_RAG_EMBED_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embed_model: String,

    /// Ollama generation model
    #[arg(long, env = "GROUND_RAG_LLM_MODEL", default_value = DEFAULT_GENERATION_MODEL)]
    pub llm_model: String,

    /// Ollama server address
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_BASE_URL)]
    pub ollama_url: String,

    /// Drop the persisted index and re-embed every document
    #[arg(long)]
    pub rebuild: bool,

    /// Print the sources used after each answer
    #[arg(long)]
    pub show_sources: bool,

    /// Log pipeline activity to stderr (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The validated pipeline configuration.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .similarity_threshold(self.min_score)
            .build()
    }

    /// Connection settings for the Ollama providers.
    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig::default()
            .with_base_url(normalize_base_url(&self.ollama_url))
            .with_embedding_model(&self.embed_model)
            .with_generation_model(&self.llm_model)
    }
}

/// Accept `OLLAMA_HOST` values without a scheme, as Ollama itself does.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") }
}

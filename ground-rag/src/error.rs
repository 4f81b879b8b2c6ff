//! Error types for the `ground-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or querying the RAG pipeline.
///
/// Build-phase errors ([`SourceNotFound`](RagError::SourceNotFound),
/// [`EmptyCorpus`](RagError::EmptyCorpus),
/// [`IndexUnavailable`](RagError::IndexUnavailable)) are fatal. Query-phase
/// errors are local to one question; see [`RagError::is_recoverable`].
#[derive(Debug, Error)]
pub enum RagError {
    /// The configured corpus location does not exist or is not a directory.
    #[error("Data folder not found: {}", path.display())]
    SourceNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The corpus contains no eligible documents.
    #[error("No eligible documents found in {location}")]
    EmptyCorpus {
        /// Description of the corpus location that was scanned.
        location: String,
    },

    /// The backing storage of the vector index cannot be opened or written.
    #[error("Vector index unavailable at {}: {message}", path.display())]
    IndexUnavailable {
        /// The index storage location.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A vector does not match the dimensionality fixed by the index.
    #[error("Embedding dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the vectors already stored.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The embedding service failed to produce a vector.
    #[error("Embedding failed ({provider}): {message}")]
    EmbeddingFailed {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The language-model service could not be reached or returned an error.
    #[error("Generation unavailable ({provider}, model {model}): {message}")]
    GenerationUnavailable {
        /// The language-model provider.
        provider: String,
        /// The model that was requested.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// A question was asked before the build phase completed.
    #[error("Pipeline is not ready: the build phase has not completed")]
    NotReady,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a corpus file failed.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RagError {
    /// Whether the error only affects the current question.
    ///
    /// The interactive loop reports recoverable errors inline and moves on to
    /// the next question; anything else aborts the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmbeddingFailed { .. } | Self::GenerationUnavailable { .. })
    }

    /// Actionable guidance for provisioning a missing service, if any.
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::EmbeddingFailed { provider, .. } if provider == "Ollama" => Some(
                "Check that Ollama is running (`ollama serve`) and the embedding model is pulled, \
                 e.g. `ollama pull nomic-embed-text`"
                    .to_string(),
            ),
            Self::GenerationUnavailable { provider, model, .. } if provider == "Ollama" => {
                Some(format!(
                    "Check that Ollama is running (`ollama serve`) and the model is pulled: \
                     `ollama pull {model}`"
                ))
            }
            Self::EmbeddingFailed { provider, .. } => {
                Some(format!("Check that the {provider} embedding service is reachable"))
            }
            Self::GenerationUnavailable { provider, model, .. } => {
                Some(format!("Check that the {provider} service is reachable and serves {model}"))
            }
            Self::EmptyCorpus { location } => {
                Some(format!("Add at least one non-empty text file to {location}"))
            }
            _ => None,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_query_errors_are_recoverable() {
        let embed = RagError::EmbeddingFailed { provider: "Ollama".into(), message: "x".into() };
        let generate = RagError::GenerationUnavailable {
            provider: "Ollama".into(),
            model: "llama3:8b".into(),
            message: "connection refused".into(),
        };
        assert!(embed.is_recoverable());
        assert!(generate.is_recoverable());
        assert!(!RagError::EmptyCorpus { location: "data".into() }.is_recoverable());
        assert!(!RagError::NotReady.is_recoverable());
    }

    #[test]
    fn generation_remediation_names_the_model() {
        let err = RagError::GenerationUnavailable {
            provider: "Ollama".into(),
            model: "llama3:8b".into(),
            message: "connection refused".into(),
        };
        let hint = err.remediation().unwrap();
        assert!(hint.contains("ollama pull llama3:8b"));
    }

    #[test]
    fn index_errors_have_no_remediation() {
        let err = RagError::IndexUnavailable { path: ".rag_index".into(), message: "bad".into() };
        assert!(err.remediation().is_none());
        assert!(err.to_string().contains(".rag_index"));
    }
}

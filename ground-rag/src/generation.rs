//! Grounded answer generation.
//!
//! The [`AnswerGenerator`] turns a question and its [`RetrievalResult`] into a
//! single [`Prompt`] whose instruction restricts the model to the supplied
//! context, then calls the [`LanguageModel`] exactly once.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::document::{Answer, RetrievalResult};
use crate::error::Result;

/// Fixed grounding instruction sent as the system part of every prompt.
pub const GROUNDING_INSTRUCTION: &str = "You are a helpful assistant. Use ONLY the provided \
context to answer. If the context does not contain the answer, say that you don't know. \
Do not use outside knowledge. When you use a passage, cite its source.";

/// Context placeholder used when retrieval returned nothing.
pub const NO_CONTEXT_MARKER: &str = "(no relevant context was found)";

/// A prompt made of a system instruction and a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Instruction constraining the model's behaviour.
    pub system: String,
    /// The question together with the retrieved context.
    pub user: String,
}

impl Prompt {
    /// Flatten the prompt for backends that take a single string.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// A language-model service: one blocking call from prompt to text.
///
/// Unreachable or failing services must be reported as
/// [`RagError::GenerationUnavailable`](crate::RagError::GenerationUnavailable).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a complete response for the prompt.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Short provider name used in logs.
    fn name(&self) -> &str;
}

/// Build the grounded prompt for a question.
///
/// Each retrieved chunk is numbered and tagged with its source so the model
/// can cite it. With no retrieved chunks the context is [`NO_CONTEXT_MARKER`].
pub fn build_prompt(question: &str, retrieval: &RetrievalResult) -> Prompt {
    let context = if retrieval.is_empty() {
        NO_CONTEXT_MARKER.to_string()
    } else {
        let mut context = String::new();
        for (i, chunk) in retrieval.chunks().enumerate() {
            if i > 0 {
                context.push_str("\n\n");
            }
            let _ = write!(context, "[{}] (source: {})\n{}", i + 1, chunk.source, chunk.text);
        }
        context
    };

    Prompt {
        system: GROUNDING_INSTRUCTION.to_string(),
        user: format!("Question: {question}\n\nContext:\n{context}"),
    }
}

/// Wraps a [`LanguageModel`] with the fixed grounding template.
pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerGenerator {
    /// Create a generator backed by the given model.
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Answer `question` from the retrieved chunks.
    ///
    /// The model is always called, even with no context, so it can say it
    /// does not know. Failures are not retried.
    pub async fn generate(&self, question: &str, retrieval: &RetrievalResult) -> Result<Answer> {
        let prompt = build_prompt(question, retrieval);
        let text = self.llm.generate(&prompt).await.inspect_err(|e| {
            error!(provider = self.llm.name(), error = %e, "generation failed");
        })?;

        info!(context_chunks = retrieval.len(), "generated answer");
        Ok(Answer { text: text.trim().to_string(), chunks: retrieval.chunks().cloned().collect() })
    }
}

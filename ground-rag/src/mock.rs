//! Deterministic test doubles for the external services.
//!
//! [`MockEmbeddingProvider`] hashes words into buckets, so texts that share
//! words get similar vectors without any model. [`MockLanguageModel`] records
//! every prompt and answers with a fixed text or a closure.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{LanguageModel, Prompt};

/// Bag-of-words embedding provider for tests and demos.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    fail: bool,
    calls: Mutex<usize>,
}

impl MockEmbeddingProvider {
    /// Create a provider producing `dimensions`-sized vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, fail: false, calls: Mutex::new(0) }
    }

    /// A provider whose every call fails with [`RagError::EmbeddingFailed`].
    pub fn failing() -> Self {
        Self { dimensions: 0, fail: true, calls: Mutex::new(0) }
    }

    /// Number of texts embedded so far.
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }

    fn bucket(&self, word: &str) -> usize {
        let hash = word.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        if self.fail {
            return Err(RagError::EmbeddingFailed {
                provider: "Mock".into(),
                message: "embedding service unreachable".into(),
            });
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            embedding[self.bucket(&word.to_lowercase())] += 1.0;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn name(&self) -> &str {
        "Mock"
    }

    fn model_id(&self) -> String {
        format!("Mock/{}", self.dimensions)
    }
}

type Responder = Box<dyn Fn(&Prompt) -> String + Send + Sync>;

/// A language model that records prompts and returns canned responses.
pub struct MockLanguageModel {
    responder: Option<Responder>,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockLanguageModel {
    /// Always answer with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::with_responder(move |_| response.clone())
    }

    /// Compute the answer from the prompt.
    pub fn with_responder(responder: impl Fn(&Prompt) -> String + Send + Sync + 'static) -> Self {
        Self { responder: Some(Box::new(responder)), prompts: Mutex::new(Vec::new()) }
    }

    /// A model whose every call fails with [`RagError::GenerationUnavailable`].
    pub fn unavailable() -> Self {
        Self { responder: None, prompts: Mutex::new(Vec::new()) }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        match &self.responder {
            Some(responder) => Ok(responder(prompt)),
            None => Err(RagError::GenerationUnavailable {
                provider: "Mock".into(),
                model: "mock".into(),
                message: "language model unreachable".into(),
            }),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

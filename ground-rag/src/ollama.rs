//! Ollama providers for embeddings and answer generation.
//!
//! This module is only available when the `ollama` feature is enabled.
//! Both providers talk to a local Ollama server over its HTTP API and make
//! exactly one request per call: no retries, no client-side timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{LanguageModel, Prompt};

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// The default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "llama3:8b";

const PROVIDER: &str = "Ollama";

/// Connection and model settings shared by the Ollama providers.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server, without a trailing slash.
    pub base_url: String,
    /// Model used for `/api/embeddings`.
    pub embedding_model: String,
    /// Model used for `/api/chat`.
    pub generation_model: String,
    /// Sampling temperature; 0 keeps answers deterministic.
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: 0.0,
        }
    }
}

impl OllamaConfig {
    /// Set the server base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the embedding model name.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the generation model name.
    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.generation_model = model.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Extract Ollama's `{"error": "..."}` message from a failed response body.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body)
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embeddings` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use ground_rag::ollama::{OllamaConfig, OllamaEmbeddingProvider};
///
/// let provider = OllamaEmbeddingProvider::new(OllamaConfig::default());
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for the configured server and embedding model.
    pub fn new(config: OllamaConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    /// Create a provider sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    /// The embedding model name.
    pub fn model(&self) -> &str {
        &self.config.embedding_model
    }

    fn failure(&self, message: String) -> RagError {
        RagError::EmbeddingFailed {
            provider: PROVIDER.into(),
            message: format!("{message} (model {})", self.config.embedding_model),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding text");

        let request = EmbeddingRequest { model: &self.config.embedding_model, prompt: text };
        let response = self
            .client
            .post(self.config.endpoint("/api/embeddings"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(self.failure(format!("API returned {status}: {}", error_detail(body))));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse embedding response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        if parsed.embedding.is_empty() {
            return Err(self.failure("API returned an empty embedding".to_string()));
        }
        Ok(parsed.embedding)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        format!("{PROVIDER}/{}", self.config.embedding_model)
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`LanguageModel`] backed by Ollama's `/api/chat` endpoint.
///
/// The prompt's system part and user part are sent as two chat messages with
/// streaming disabled.
pub struct OllamaChatModel {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaChatModel {
    /// Create a model client for the configured server and generation model.
    pub fn new(config: OllamaConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    /// Create a model client sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    /// The generation model name.
    pub fn model(&self) -> &str {
        &self.config.generation_model
    }

    fn unavailable(&self, message: String) -> RagError {
        RagError::GenerationUnavailable {
            provider: PROVIDER.into(),
            model: self.config.generation_model.clone(),
            message,
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaChatModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.config.generation_model, "generating answer");

        let request = ChatRequest {
            model: &self.config.generation_model,
            messages: vec![
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            stream: false,
            options: ChatOptions { temperature: self.config.temperature },
        };

        let response = self
            .client
            .post(self.config.endpoint("/api/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "generation request failed");
                self.unavailable(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "generation API error");
            return Err(self.unavailable(format!("API returned {status}: {}", error_detail(body))));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse generation response");
            self.unavailable(format!("failed to parse response: {e}"))
        })?;
        Ok(parsed.message.content)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strips_trailing_slash() {
        let config = OllamaConfig::default().with_base_url("http://gpu-box:11434/");
        assert_eq!(config.endpoint("/api/chat"), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn error_detail_prefers_ollama_error_field() {
        let detail = error_detail(r#"{"error":"model 'llama3:8b' not found"}"#.to_string());
        assert_eq!(detail, "model 'llama3:8b' not found");
        assert_eq!(error_detail("plain text".to_string()), "plain text");
    }

    #[test]
    fn chat_request_serializes_two_messages_without_streaming() {
        let prompt = Prompt { system: "sys".into(), user: "Question: q".into() };
        let request = ChatRequest {
            model: "llama3:8b",
            messages: vec![
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Question: q");
    }

    #[tokio::test]
    async fn unreachable_server_is_generation_unavailable() {
        // Port 9 (discard) is not an Ollama server; the connection is refused.
        let config = OllamaConfig::default().with_base_url("http://127.0.0.1:9");
        let model = OllamaChatModel::new(config);
        let prompt = Prompt { system: "s".into(), user: "u".into() };
        let err = model.generate(&prompt).await.unwrap_err();
        assert!(matches!(err, RagError::GenerationUnavailable { ref model, .. } if model == "llama3:8b"));
        assert!(err.remediation().unwrap().contains("ollama pull llama3:8b"));
    }

    #[test]
    fn embedding_model_id_names_the_model() {
        let a = OllamaEmbeddingProvider::new(OllamaConfig::default());
        let b = OllamaEmbeddingProvider::new(
            OllamaConfig::default().with_embedding_model("mxbai-embed-large"),
        );
        assert_eq!(a.model_id(), "Ollama/nomic-embed-text");
        assert_ne!(a.model_id(), b.model_id());
    }

    #[tokio::test]
    async fn unreachable_server_is_embedding_failed() {
        let config = OllamaConfig::default().with_base_url("http://127.0.0.1:9");
        let provider = OllamaEmbeddingProvider::new(config);
        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingFailed { .. }));
    }
}

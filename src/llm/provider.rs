//! LLM Provider trait — common interface for all generation backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One chat message in the order providers expect it on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

// ── Common Parameters ──────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct LlmParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

/// Common interface for LLM providers (OpenAI-compatible, Ollama, etc.)
///
/// The engine only needs a single non-streaming completion; the call is
/// fallible and may be slow, and the orchestrator owns the fallback policy
/// when it errors or returns nothing usable.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Non-streaming chat completion.
    async fn chat(
        &self,
        messages: Vec<Message>,
        options: Option<LlmParams>,
    ) -> Result<String, String>;

    /// Provider identifier (e.g. "openai", "ollama").
    fn id(&self) -> &str;
}

// ── OpenAI adapter ─────────────────────────────────────

use crate::llm::openai::OpenAIClient;

/// Wraps `OpenAIClient` to implement `LlmProvider`.
pub struct OpenAIProvider {
    client: OpenAIClient,
    provider_id: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: OpenAIClient::new(api_key, base_url, model),
            provider_id: "openai".to_string(),
        }
    }

    pub fn with_id(mut self, id: String) -> Self {
        self.provider_id = id;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        options: Option<LlmParams>,
    ) -> Result<String, String> {
        self.client.chat(messages, options).await
    }

    fn id(&self) -> &str {
        &self.provider_id
    }
}

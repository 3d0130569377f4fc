//! Ollama provider — non-streaming completion via `/api/chat`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::provider::{LlmParams, LlmProvider, Message};

/// Ollama-native message format.
#[derive(Debug, Clone, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessageResponse>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageResponse {
    content: Option<String>,
}

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>, model: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
        }
    }

    fn build_options(opts: &LlmParams) -> Option<serde_json::Value> {
        let mut options = serde_json::Map::new();
        if let Some(t) = opts.temperature {
            options.insert("temperature".to_string(), serde_json::json!(t));
        }
        if let Some(n) = opts.max_tokens {
            options.insert("num_predict".to_string(), serde_json::json!(n));
        }
        if let Some(p) = opts.top_p {
            options.insert("top_p".to_string(), serde_json::json!(p));
        }
        if let Some(ref stop) = opts.stop {
            options.insert("stop".to_string(), serde_json::json!(stop));
        }
        if options.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(options))
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        options: Option<LlmParams>,
    ) -> Result<String, String> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let opts = options.unwrap_or_default();

        let request_body = OllamaChatRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|m| OllamaMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            stream: false,
            options: Self::build_options(&opts),
        };

        let client = self.client.clone();
        let url_clone = url.clone();
        let body = request_body.clone();

        let response = crate::utils::http::request_with_retry(
            move || {
                let client = client.clone();
                let url = url_clone.clone();
                let body = body.clone();
                async move { client.post(&url).json(&body).send().await }
            },
            2,
        )
        .await
        .map_err(|e| format!("Failed to connect to Ollama at {}: {}", self.base_url, e))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Ollama API error: {}", error_text));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Ollama response: {}", e))?;

        Ok(parsed
            .message
            .and_then(|m| m.content)
            .unwrap_or_default())
    }

    fn id(&self) -> &str {
        "ollama"
    }
}

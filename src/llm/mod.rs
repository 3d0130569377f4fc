pub mod llm_config;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod service;

pub use llm_config::{load_config, save_config, LlmConfig, LlmProviderConfig};
pub use ollama::OllamaProvider;
pub use provider::{LlmParams, LlmProvider, Message, OpenAIProvider};
pub use service::LlmService;

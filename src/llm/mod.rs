//! LLM provider adapters.

mod http;

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;
pub use provider::Provider;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// A backend that turns a prompt into generated text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Generate a completion for `prompt`.
    ///
    /// `Ok(None)` means the provider answered but the response carried no
    /// text.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError>;
}

/// Build the client for the configured provider.
pub fn client_for(config: &LlmConfig) -> Result<Box<dyn LlmClient>, LlmError> {
    let client: Box<dyn LlmClient> = match config.provider {
        Provider::Ollama => Box::new(OllamaClient::new(config)?),
        Provider::Gemini => Box::new(GeminiClient::new(config)?),
        Provider::OpenAi | Provider::OpenRouter | Provider::Nvidia => {
            Box::new(OpenAiCompatibleClient::new(config)?)
        }
    };
    Ok(client)
}

/// Build a client from a provider identifier.
///
/// Fails with [`LlmError::UnsupportedProvider`] for unknown identifiers.
pub fn client_for_name(name: &str, config: &LlmConfig) -> Result<Box<dyn LlmClient>, LlmError> {
    let provider: Provider = name.parse().map_err(LlmError::UnsupportedProvider)?;
    client_for(&LlmConfig {
        provider,
        ..config.clone()
    })
}

//! Ollama `/api/generate` adapter.

use async_trait::async_trait;
use serde::Serialize;

use super::http::{Transport, headers, string_at};
use super::{LlmClient, Provider};
use crate::config::LlmConfig;
use crate::error::LlmError;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

/// Client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    transport: Transport,
    config: LlmConfig,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            transport: Transport::new(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self.transport.post_json(&url, headers(&[]), &request).await?;
        Ok(string_at(&response, "/response"))
    }
}

//! OpenAI-compatible `/chat/completions` adapter.
//!
//! Serves OpenAI, OpenRouter and NVIDIA, which share the request shape.

use async_trait::async_trait;
use serde::Serialize;

use super::http::{Transport, headers, string_at};
use super::{LlmClient, Provider};
use crate::config::LlmConfig;
use crate::error::LlmError;

/// App name OpenRouter shows for requests from this tool.
const OPENROUTER_TITLE: &str = "commity";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Client for chat-completions style APIs.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    transport: Transport,
    config: LlmConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            transport: Transport::new(config)?,
            config: config.clone(),
        })
    }

    fn request_headers(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(key) = self.config.api_key.as_deref() {
            entries.push(("authorization", format!("Bearer {key}")));
        }
        if self.config.provider == Provider::OpenRouter {
            entries.push(("x-title", OPENROUTER_TITLE.to_string()));
        }
        entries
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn provider(&self) -> Provider {
        self.config.provider
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .transport
            .post_json(&url, headers(&self.request_headers()), &request)
            .await?;
        Ok(string_at(&response, "/choices/0/message/content"))
    }
}

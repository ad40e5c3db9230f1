//! Google Gemini `generateContent` adapter.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::http::{Transport, headers};
use super::{LlmClient, Provider};
use crate::config::LlmConfig;
use crate::error::LlmError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// Client for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    transport: Transport,
    config: LlmConfig,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            transport: Transport::new(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };
        let api_key = self.config.api_key.clone().unwrap_or_default();

        let response = self
            .transport
            .post_json(&url, headers(&[("x-goog-api-key", api_key)]), &request)
            .await?;
        Ok(last_text_part(&response))
    }
}

/// Thinking models put reasoning in earlier parts; the answer is the last.
fn last_text_part(response: &Value) -> Option<String> {
    response
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .next_back()
        .map(str::to_string)
}

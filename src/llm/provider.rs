//! Supported LLM providers and their defaults.

use std::fmt;
use std::str::FromStr;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    Ollama,
    #[default]
    Gemini,
    OpenAi,
    OpenRouter,
    Nvidia,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Ollama,
        Provider::Gemini,
        Provider::OpenAi,
        Provider::OpenRouter,
        Provider::Nvidia,
    ];

    /// Identifier used on the command line and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
            Provider::Nvidia => "nvidia",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Nvidia => "https://integrate.api.nvidia.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Ollama => "llama3",
            Provider::Gemini => "gemini-2.5-flash",
            Provider::OpenAi => "gpt-3.5-turbo",
            Provider::OpenRouter => "qwen/qwen3-coder:free",
            Provider::Nvidia => "nvidia/llama-3.1-70b-instruct",
        }
    }

    /// Local providers run without credentials.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

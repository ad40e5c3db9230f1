//! Error types for commity modules using thiserror.

use thiserror::Error;

/// Errors from resolving the LLM configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Provider '{0}' is not supported (expected one of: ollama, gemini, openai, openrouter, nvidia)")]
    UnsupportedProvider(String),

    #[error("API key must be specified for provider '{0}' (use --api-key or COMMITY_API_KEY)")]
    MissingApiKey(String),

    #[error("Temperature must be greater than or equal to 0 and less than or equal to 1, got {0}")]
    InvalidTemperature(f32),

    #[error("{field} must be greater than 0")]
    NotPositive { field: &'static str },

    #[error("Invalid value '{value}' for {var}")]
    InvalidEnvValue { var: String, value: String },
}

/// Errors from reading staged changes or committing them.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to collect staged diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),
}

/// Errors from LLM provider requests.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Provider {0} is not supported")]
    UnsupportedProvider(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {provider} failed: {source}")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} returned a response that is not valid JSON: {source}")]
    InvalidResponse {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
}

impl LlmError {
    /// HTTP status code, when the provider answered with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmError::Status { status, .. } => Some(*status),
            LlmError::Request { source, .. } | LlmError::InvalidResponse { source, .. } => {
                source.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }
}

/// Errors from parsing unified diff text.
///
/// Never surfaced by the budgeting pipeline; a parse failure selects the
/// line-compression fallback instead.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiffParseError {
    #[error("No file headers found in diff text")]
    NoFileHeaders,

    #[error("Could not determine file path from header '{0}'")]
    MalformedHeader(String),
}

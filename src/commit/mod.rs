//! AI-generated commit messages: prompt in, cleaned message out.

pub mod cleanup;
pub mod prompt;

pub use cleanup::clean_thinking_process;
pub use prompt::{DEFAULT_MAX_SUBJECT_CHARS, PromptOptions, build_commit_prompt};

use tracing::debug;

use crate::budget::summary_and_tokens_checker;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::LlmClient;

/// Generate a commit message for `diff`.
///
/// The diff is fitted to `config.max_tokens` for the configured model
/// before it is embedded in the prompt, and the reply is stripped of model
/// reasoning. `Ok(None)` when the provider returned no usable text.
pub async fn generate_commit_message(
    client: &dyn LlmClient,
    config: &LlmConfig,
    diff: &str,
    options: &PromptOptions,
) -> Result<Option<String>, LlmError> {
    let fitted = summary_and_tokens_checker(
        diff,
        config.max_tokens as usize,
        &config.model,
        config.provider.as_str(),
    );
    let prompt = build_commit_prompt(&fitted, options);
    debug!(
        diff_chars = diff.len(),
        fitted_chars = fitted.len(),
        "Built commit prompt"
    );

    let message = client
        .generate(&prompt)
        .await?
        .map(|raw| clean_thinking_process(&raw))
        .filter(|msg| !msg.is_empty());
    Ok(message)
}

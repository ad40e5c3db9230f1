//! commity - A CLI tool that generates commit messages from staged changes.
//!
//! # Overview
//!
//! commity reads the staged diff with git2, fits it into the token budget of
//! the configured LLM (ranking files by importance and compressing what does
//! not fit), asks the provider for a commit message and commits it on
//! confirmation.

pub mod budget;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;

// Re-export commonly used types
pub use budget::{DiffBudget, estimate_tokens, summary_and_tokens_checker};
pub use commit::{PromptOptions, build_commit_prompt, clean_thinking_process};
pub use config::{ConfigLayer, LlmConfig};
pub use error::{ConfigError, DiffParseError, GitError, LlmError};
pub use llm::{LlmClient, Provider, client_for};

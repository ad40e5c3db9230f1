//! commity - CLI entry point.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dialoguer::Confirm;
use tracing_subscriber::EnvFilter;

use commity::commit::{DEFAULT_MAX_SUBJECT_CHARS, PromptOptions, generate_commit_message};
use commity::config::{self, ConfigLayer};
use commity::git::{commit_staged, open_repository, staged_diff};
use commity::llm::client_for;

/// Whether to ask before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfirmMode {
    Y,
    N,
}

/// Generate a commit message for the staged changes using an LLM.
#[derive(Parser, Debug)]
#[command(name = "commity")]
#[command(about = "AI-powered git commit message generator")]
#[command(version)]
struct Cli {
    /// LLM provider (ollama, gemini, openai, openrouter, nvidia)
    #[arg(long)]
    provider: Option<String>,

    /// LLM base URL
    #[arg(long, alias = "base_url")]
    base_url: Option<String>,

    /// LLM model name
    #[arg(long)]
    model: Option<String>,

    /// LLM API key
    #[arg(long, alias = "api_key")]
    api_key: Option<String>,

    /// Language for the commit message
    #[arg(long, default_value = "en")]
    language: String,

    /// Sampling temperature (0 to 1)
    #[arg(long)]
    temperature: Option<f32>,

    /// Token budget for the request; the diff is compressed to fit
    #[arg(long, alias = "max_tokens")]
    max_tokens: Option<u32>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Proxy URL for provider requests
    #[arg(long)]
    proxy: Option<String>,

    /// Include emojis in the commit message
    #[arg(long)]
    emoji: bool,

    /// Commit message style
    #[arg(long = "type", default_value = "conventional")]
    style: String,

    /// Maximum subject line length
    #[arg(long, default_value_t = DEFAULT_MAX_SUBJECT_CHARS)]
    max_subject_chars: usize,

    /// Print the resolved configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Ask before committing (y/n)
    #[arg(long, value_enum, default_value = "y")]
    confirm: ConfirmMode,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            provider: self.provider.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
            proxy: self.proxy.clone(),
            debug: self.debug.then_some(true),
        }
    }

    fn prompt_options(&self) -> PromptOptions {
        PromptOptions {
            language: self.language.clone(),
            emoji: self.emoji,
            style: self.style.clone(),
            max_subject_chars: self.max_subject_chars,
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn confirm_commit() -> dialoguer::Result<bool> {
    Confirm::new()
        .with_prompt("Do you want to commit with this message?")
        .default(false)
        .interact()
}

/// A prompt that cannot be answered (no terminal) is an error, not a "no".
fn read_confirmation(answer: dialoguer::Result<bool>) -> Result<bool> {
    answer.context("Failed to read confirmation; pass --confirm n when not running in a terminal")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Installed before loading so config file warnings are visible
    let env_debug = ConfigLayer::from_env().ok().and_then(|layer| layer.debug);
    init_tracing(cli.debug || env_debug.unwrap_or(false));

    let config = config::load(cli.config_layer()).context("Invalid configuration")?;

    if cli.show_config {
        println!("Current configuration:");
        println!("{config}");
        return Ok(());
    }

    let client = client_for(&config).context("Failed to set up LLM client")?;

    let repo = open_repository()
        .context("Not a git repository. Run commity from within a git repository.")?;
    let staged = staged_diff(&repo).context("Failed to read staged changes")?;

    if staged.text.trim().is_empty() {
        println!("No staged changes detected. Stage files with `git add` first.");
        return Ok(());
    }

    println!(
        "Generating commit message with {} ({}) for {} file(s), +{} -{}...",
        config.provider,
        config.model,
        staged.files.len(),
        staged.additions,
        staged.deletions
    );

    let message = generate_commit_message(
        client.as_ref(),
        &config,
        &staged.text,
        &cli.prompt_options(),
    )
    .await
    .context("Failed to generate commit message")?;

    let Some(message) = message else {
        anyhow::bail!("Failed to generate commit message: the provider returned no text");
    };

    println!();
    println!("──── Suggested Commit Message ────");
    println!("{message}");
    println!("──────────────────────────────────");

    if cli.confirm == ConfirmMode::N {
        return Ok(());
    }

    let confirmed = read_confirmation(confirm_commit())?;

    if confirmed {
        let oid = commit_staged(&repo, &message).context("Failed to commit")?;
        println!("Committed successfully ({}).", &oid.to_string()[..7]);
    } else {
        println!("Commit cancelled.");
    }

    Ok(())
}

//! Diff-to-prompt budgeting.
//!
//! Fits a staged diff into the token budget of an LLM prompt. A diff that
//! already fits is returned untouched; anything larger goes through a ranked
//! per-file summary and, if that is still too large, a middle cut.

pub mod compress;
pub mod importance;
pub mod parse;
pub mod profile;
pub mod tokens;

pub use compress::{
    DEFAULT_MAX_LINES, compress_with_lines, compress_with_structure, summarize_files,
    truncate_middle,
};
pub use importance::{rank_files, score, score_file};
pub use parse::{ChangeLine, FileDiff, ParsedDiff, parse_diff};
pub use profile::{ProviderProfile, profile_for};
pub use tokens::{TokenEstimator, estimate_tokens};

use tracing::debug;

/// Raw diffs longer than this many characters get a size warning prepended.
pub const DIFF_WARNING_THRESHOLD: usize = 15_000;

/// Fit `diff_text` into `max_output_tokens` for the given model and provider.
///
/// Uses the default [`DiffBudget`].
pub fn summary_and_tokens_checker(
    diff_text: &str,
    max_output_tokens: usize,
    model_name: &str,
    provider: &str,
) -> String {
    DiffBudget::default().fit(diff_text, max_output_tokens, model_name, provider)
}

/// Settings for fitting a diff into a token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffBudget {
    /// Change lines kept per file in the summary.
    pub max_lines: usize,
    /// Character length above which a size warning is added.
    pub warning_threshold: usize,
}

impl Default for DiffBudget {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            warning_threshold: DIFF_WARNING_THRESHOLD,
        }
    }
}

impl DiffBudget {
    /// Fit `diff_text` into `max_tokens`.
    ///
    /// - Text within budget is returned unchanged.
    /// - Otherwise files are summarized by importance, with a size warning
    ///   in front when the raw diff is very long and the budget has room.
    /// - If the summary is still over budget, its middle is cut.
    /// - The result is never longer than the input, and never empty for
    ///   non-empty input.
    pub fn fit(&self, diff_text: &str, max_tokens: usize, model_name: &str, provider: &str) -> String {
        let count = |text: &str| estimate_tokens(text, model_name, provider);

        let raw_tokens = count(diff_text);
        if raw_tokens <= max_tokens {
            return diff_text.to_string();
        }

        let raw_chars = diff_text.chars().count();
        debug!(
            raw_tokens,
            max_tokens, raw_chars, "Diff exceeds token budget, compressing"
        );

        let warning = (raw_chars > self.warning_threshold).then(|| {
            format!(
                "Warning: diff is very large ({raw_chars} characters); consider committing in smaller batches."
            )
        });
        let summarize = |budget: usize| {
            let body = summarize_files(diff_text, budget, self.max_lines, &count);
            if body.trim().is_empty() {
                debug!("Compression produced nothing, falling back to raw text");
                return diff_text.to_string();
            }
            body
        };

        let mut result = match warning {
            Some(w) if count(&w) + 1 < max_tokens => {
                let with_warning = format!("{w}\n\n{}", summarize(max_tokens - count(&w) - 1));
                if count(&with_warning) <= max_tokens {
                    with_warning
                } else {
                    debug!("Size warning does not fit with the summary, dropping it");
                    summarize(max_tokens)
                }
            }
            _ => summarize(max_tokens),
        };

        let tokens = count(&result);
        if tokens > max_tokens {
            let ratio = profile_for(provider).chars_per_token(&result);
            debug!(tokens, max_tokens, ratio, "Summary still over budget, truncating middle");
            result = truncate_middle(&result, tokens - max_tokens, ratio);
        }

        if result.len() > diff_text.len() {
            debug!("Summary longer than raw diff, truncating raw diff instead");
            let ratio = profile_for(provider).chars_per_token(diff_text);
            result = truncate_middle(diff_text, raw_tokens - max_tokens, ratio);
        }

        debug!(
            final_tokens = count(&result),
            final_chars = result.chars().count(),
            "Diff fitted"
        );
        result
    }
}

//! Prompt construction for AI-generated commit messages.

/// Default upper bound for the subject line.
pub const DEFAULT_MAX_SUBJECT_CHARS: usize = 50;

/// Commit types and the emoji used for each when emoji output is on.
const TYPE_EMOJIS: &[(&str, &str, &str)] = &[
    ("feat", "✨", "a new feature"),
    ("fix", "🐛", "a bug fix"),
    ("docs", "📝", "documentation only changes"),
    ("style", "💄", "formatting, no code change"),
    ("refactor", "♻️", "code change that neither fixes a bug nor adds a feature"),
    ("perf", "⚡", "a performance improvement"),
    ("test", "✅", "adding or correcting tests"),
    ("build", "📦", "build system or dependency changes"),
    ("ci", "👷", "CI configuration changes"),
    ("chore", "🔧", "other changes that don't modify src or test files"),
    ("revert", "⏪", "reverts a previous commit"),
];

/// How the commit message should look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    /// Language code for the message text (`en`, `zh`, ...).
    pub language: String,
    pub emoji: bool,
    /// Message style; `conventional` selects Conventional Commits.
    pub style: String,
    pub max_subject_chars: usize,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            emoji: false,
            style: "conventional".to_string(),
            max_subject_chars: DEFAULT_MAX_SUBJECT_CHARS,
        }
    }
}

/// Build the LLM prompt for generating a commit message from `diff`.
///
/// `diff` is embedded verbatim; callers fit it to the token budget first.
pub fn build_commit_prompt(diff: &str, options: &PromptOptions) -> String {
    let max = options.max_subject_chars;
    let format_line = if options.emoji {
        "type(scope): <emoji> description"
    } else {
        "type(scope): description"
    };

    let style_section = if options.style.eq_ignore_ascii_case("conventional") {
        let types: String = TYPE_EMOJIS
            .iter()
            .map(|(ty, _, meaning)| format!("- {ty}: {meaning}\n"))
            .collect();
        format!(
            "## Style\nFollow the Conventional Commits specification.\nFormat: `{format_line}`\nAllowed types:\n{types}"
        )
    } else {
        format!("## Style\nWrite the message in the \"{}\" style.\n", options.style)
    };

    let emoji_section = if options.emoji {
        let table: String = TYPE_EMOJIS
            .iter()
            .map(|(ty, emoji, _)| format!("- {ty} → {emoji}\n"))
            .collect();
        format!(
            "## Emoji\nPut the emoji matching the type after the colon, as in `{format_line}`:\n{table}"
        )
    } else {
        "## Emoji\nDo not include emojis.\n".to_string()
    };

    format!(
        r#"You are an expert software engineer writing a Git commit message for the staged changes below.

{style_section}
## Subject Line Rules (STRICT)
- The ENTIRE subject line MUST be ≤{max} characters
- Imperative mood ("add", "fix", "remove"), no period at the end
- Scope: the primary module affected, omitted if unclear

## Body Rules
- Separate the body from the subject with a blank line
- Explain what changed and why; the diff already shows how
- Wrap lines at 72 characters
- For trivial changes, omit the body

{emoji_section}
## Language
Write the commit message in language code: {language}

## Output
Respond with ONLY the commit message, no explanation and no code fences.

Git Diff:
{diff}
"#,
        language = options.language,
    )
}

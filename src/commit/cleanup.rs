//! Post-processing of generated commit messages.

use std::sync::LazyLock;

use regex_lite::Regex;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("Invalid regex"));

/// A Conventional Commit subject line, optionally behind an emoji:
/// `type(scope)!: description`.
static SUBJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:[^"'•*\-\w\n\r]+\s+)?([a-z0-9_]+)(\([\w\-./]+\))?(!)?: .+"#)
        .expect("Invalid regex")
});

/// Strip model reasoning from a generated commit message.
///
/// Removes `<think>...</think>` blocks anywhere in the text. If a Conventional
/// Commit subject line follows some preamble, everything before it is
/// dropped. Lines after the subject are kept.
pub fn clean_thinking_process(message: &str) -> String {
    let without_blocks = THINK_BLOCK.replace_all(message, "");
    let text = without_blocks.trim();

    match SUBJECT_LINE.find(text) {
        Some(m) => text[m.start()..].trim().to_string(),
        None => text.to_string(),
    }
}

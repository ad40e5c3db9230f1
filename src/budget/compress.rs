//! Diff compression tiers.
//!
//! - Tier 1 ([`compress_with_lines`]): changed lines only, capped count.
//! - Tier 2 ([`compress_with_structure`]): files ranked by importance and
//!   emitted whole until the token budget is spent.
//! - Tier 3 ([`truncate_middle`]): cut a span out of the middle of the text.

use tracing::debug;

use super::importance::rank_files;
use super::parse::{FileDiff, git_header_path, parse_diff};
use super::tokens::estimate_tokens;

/// Default cap on emitted change lines, for the whole diff in Tier 1 and per
/// file in Tier 2.
pub const DEFAULT_MAX_LINES: usize = 200;

/// Longest change line kept verbatim.
pub const MAX_LINE_CHARS: usize = 200;

/// Compress a diff to `+ <content>` / `- <content>` lines.
///
/// File header markers (`---`/`+++`) and context lines are dropped; each
/// `diff --git` block gets a `File:` line. After `max_lines` change lines
/// the rest are counted into a truncation marker. Works on any text,
/// including diffs the parser rejects.
pub fn compress_with_lines(diff_text: &str, max_lines: usize) -> String {
    let mut out = Vec::new();
    let mut emitted = 0usize;
    let mut skipped = 0usize;

    for line in diff_text.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if emitted < max_lines {
                let path = git_header_path(rest).unwrap_or_else(|| rest.to_string());
                out.push(format!("File: {path}"));
            }
            continue;
        }

        if is_file_header_marker(line) {
            continue;
        }

        let Some(sign) = line.chars().next().filter(|c| *c == '+' || *c == '-') else {
            continue;
        };

        if emitted >= max_lines {
            skipped += 1;
            continue;
        }

        out.push(change_line(sign, &line[1..]));
        emitted += 1;
    }

    if skipped > 0 {
        out.push(truncated_lines_marker(skipped));
    }

    out.join("\n")
}

/// Summarize a diff file by file, most important first, within `max_tokens`.
///
/// Token costs are measured with the estimator for `model_name`/`provider`.
/// See [`summarize_files`].
pub fn compress_with_structure(
    diff_text: &str,
    max_tokens: usize,
    model_name: &str,
    provider: &str,
) -> String {
    let count = |text: &str| estimate_tokens(text, model_name, provider);
    summarize_files(diff_text, max_tokens, DEFAULT_MAX_LINES, &count)
}

/// Ranked per-file summary with a caller-supplied token counter.
///
/// Files are visited in descending importance. Each gets a header and up to
/// `max_lines` change lines; the first file that does not fit ends the
/// detailed section, and the remaining files are listed by header while
/// those fit. The top-ranked file may be shortened to fit and its header is
/// always kept, so the result is never empty for a parseable diff. The
/// leading change summary is left out when it would crowd out that header.
///
/// Falls back to [`compress_with_lines`] when the text cannot be parsed.
pub fn summarize_files(
    diff_text: &str,
    max_tokens: usize,
    max_lines: usize,
    count: &dyn Fn(&str) -> usize,
) -> String {
    let parsed = match parse_diff(diff_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Diff not parseable ({}), using line compression", e);
            return compress_with_lines(diff_text, max_lines);
        }
    };

    let ranked = rank_files(&parsed.files);

    let summary = format!(
        "Change summary: {} file(s) changed, +{} -{} (compressed to fit token budget)",
        parsed.files.len(),
        parsed.total_added(),
        parsed.total_removed()
    );
    // The top header outranks the summary line when both do not fit
    let top_header_cost = ranked.first().map_or(0, |f| count(&file_header(f)) + 1);
    let summary_cost = count(&summary);
    let (mut used, mut sections) = if summary_cost + top_header_cost <= max_tokens {
        (summary_cost, vec![summary])
    } else {
        debug!(summary_cost, max_tokens, "Budget too small for the change summary, dropping it");
        (0, Vec::new())
    };

    let mut detailed = 0usize;
    for (idx, file) in ranked.iter().enumerate() {
        let shrinkable = idx == 0;
        match fit_block(file, max_lines, max_tokens.saturating_sub(used), shrinkable, count) {
            Some((block, cost)) => {
                sections.push(block);
                used += cost;
                detailed += 1;
            }
            None => break,
        }
    }

    let rest = &ranked[detailed..];
    if !rest.is_empty() {
        debug!(
            detailed,
            remaining = rest.len(),
            "Token budget reached, listing remaining files by header"
        );
        let heading = "Other changed files (details omitted):";
        let mut listing = vec![heading.to_string()];
        used += count(heading) + 1;

        let mut listed = 0usize;
        for file in rest {
            let header = file_header(file);
            let cost = count(&header) + 1;
            if used + cost > max_tokens {
                break;
            }
            listing.push(header);
            used += cost;
            listed += 1;
        }

        if listed == 0 {
            listing.clear();
        }
        let omitted = rest.len() - listed;
        if omitted > 0 {
            listing.push(format!("...<{omitted} more file(s) omitted>"));
        }
        sections.push(listing.join("\n"));
    }

    sections.join("\n\n")
}

/// Cut a contiguous middle span so the text sheds about `excess_tokens`.
///
/// The cut size is `excess_tokens * chars_per_token` characters plus room
/// for the marker. What remains is split 7:1 between lead and tail, each
/// snapped to a line boundary when one is close. Returns the text unchanged
/// when the cut would consume all of it.
pub fn truncate_middle(text: &str, excess_tokens: usize, chars_per_token: f64) -> String {
    if excess_tokens == 0 {
        return text.to_string();
    }

    let total = text.chars().count();
    let to_remove = (excess_tokens as f64 * chars_per_token).ceil() as usize;
    // The marker for `total` is never shorter than the final one
    let marker_len = elision_marker(total).len();

    let keep = total.saturating_sub(to_remove.saturating_add(marker_len));
    if keep == 0 {
        debug!(total, to_remove, "Truncation would remove everything, keeping text as-is");
        return text.to_string();
    }

    let tail_len = keep / 8;
    let lead_len = keep - tail_len;

    let lead = snap_lead(&text[..byte_offset(text, lead_len)]);
    let tail = snap_tail(&text[byte_offset(text, total - tail_len)..]);
    let elided = total - lead.chars().count() - tail.chars().count();

    format!("{lead}{}{tail}", elision_marker(elided))
}

/// Header line for a file block, with change counts and flags.
fn file_header(file: &FileDiff) -> String {
    let mut header = format!(
        "File: {} (+{} -{})",
        file.path,
        file.added_count(),
        file.removed_count()
    );
    if file.is_binary {
        header.push_str(" [binary]");
    }
    if file.is_new {
        header.push_str(" [new]");
    }
    if file.is_deleted {
        header.push_str(" [deleted]");
    }
    if file.is_renamed {
        match &file.old_path {
            Some(old) => header.push_str(&format!(" [renamed from {old}]")),
            None => header.push_str(" [renamed]"),
        }
    }
    header
}

/// Header plus up to `max_lines` change lines, in diff order.
fn file_block(file: &FileDiff, max_lines: usize) -> String {
    let mut lines = vec![file_header(file)];
    for change in file.changes.iter().take(max_lines) {
        lines.push(change_line(change.sign(), change.content()));
    }

    let total = file.changes.len();
    if total > max_lines {
        lines.push(truncated_lines_marker(total - max_lines));
    }

    lines.join("\n")
}

/// Render a file block within `available` tokens.
///
/// A shrinkable block halves its line cap until it fits and, failing that,
/// is kept as its bare header even over budget; others fit whole or not at
/// all. Returns the block and its cost including the separator.
fn fit_block(
    file: &FileDiff,
    max_lines: usize,
    available: usize,
    shrinkable: bool,
    count: &dyn Fn(&str) -> usize,
) -> Option<(String, usize)> {
    let mut lines = max_lines;
    loop {
        let block = file_block(file, lines);
        let cost = count(&block) + 1;
        if cost <= available {
            return Some((block, cost));
        }
        if !shrinkable {
            return None;
        }
        if lines == 0 {
            let header = file_header(file);
            let cost = count(&header) + 1;
            return Some((header, cost));
        }
        lines /= 2;
    }
}

fn is_file_header_marker(line: &str) -> bool {
    line.starts_with("+++ ") || line.starts_with("--- ") || line == "+++" || line == "---"
}

fn change_line(sign: char, content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return sign.to_string();
    }
    format!("{sign} {}", clip(content, MAX_LINE_CHARS))
}

fn clip(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

fn truncated_lines_marker(count: usize) -> String {
    format!("...<truncated: {count} more changed lines>")
}

fn elision_marker(count: usize) -> String {
    format!("\n...<truncated {count} characters>...\n")
}

/// Byte offset of the `n`th character (or the end).
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(idx, _)| idx)
}

/// End the lead at a line break if one is in its second half.
fn snap_lead(lead: &str) -> &str {
    match lead.rfind('\n') {
        Some(pos) if pos >= lead.len() / 2 => &lead[..pos],
        _ => lead,
    }
}

/// Start the tail after a line break if one is in its first half.
fn snap_tail(tail: &str) -> &str {
    match tail.find('\n') {
        Some(pos) if pos < tail.len() / 2 => &tail[pos + 1..],
        _ => tail,
    }
}

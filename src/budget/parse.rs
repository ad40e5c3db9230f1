//! Unified diff parsing into per-file change blocks.
//!
//! Accepts `git diff` output and plain `---`/`+++` unified diffs. Hunk line
//! counts from `@@` headers are tracked so that content lines starting with
//! `---` or `+++` are not mistaken for file headers.

use crate::error::DiffParseError;

/// Changes to a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Path after the change (the old path for deletions).
    pub path: String,
    /// Path before a rename.
    pub old_path: Option<String>,
    /// Changed lines in diff order.
    pub changes: Vec<ChangeLine>,
    pub is_binary: bool,
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_renamed: bool,
}

impl FileDiff {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Added line contents, in order.
    pub fn added(&self) -> impl Iterator<Item = &str> + '_ {
        self.changes.iter().filter_map(|c| match c {
            ChangeLine::Added(line) => Some(line.as_str()),
            ChangeLine::Removed(_) => None,
        })
    }

    /// Removed line contents, in order.
    pub fn removed(&self) -> impl Iterator<Item = &str> + '_ {
        self.changes.iter().filter_map(|c| match c {
            ChangeLine::Removed(line) => Some(line.as_str()),
            ChangeLine::Added(_) => None,
        })
    }

    pub fn added_count(&self) -> usize {
        self.added().count()
    }

    pub fn removed_count(&self) -> usize {
        self.removed().count()
    }
}

/// One changed line, without its sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeLine {
    Added(String),
    Removed(String),
}

impl ChangeLine {
    /// The `+`/`-` sign the line carried in the diff.
    pub fn sign(&self) -> char {
        match self {
            ChangeLine::Added(_) => '+',
            ChangeLine::Removed(_) => '-',
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChangeLine::Added(line) | ChangeLine::Removed(line) => line,
        }
    }
}

/// A diff split into file blocks, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    pub files: Vec<FileDiff>,
}

impl ParsedDiff {
    pub fn total_added(&self) -> usize {
        self.files.iter().map(FileDiff::added_count).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.files.iter().map(FileDiff::removed_count).sum()
    }
}

/// Where the parser is inside the current file block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Before the first hunk, or between hunks.
    Header,
    /// Inside a hunk with known remaining line counts.
    Hunk { old_left: usize, new_left: usize },
    /// Inside a hunk whose `@@` header could not be read; runs until the
    /// next `@@` or file header.
    OpenHunk,
}

/// Parse unified diff text.
///
/// Text before the first file header is ignored. Fails when no file block is
/// found, or when a block's path cannot be determined.
pub fn parse_diff(text: &str) -> Result<ParsedDiff, DiffParseError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut section = Section::Header;
    // First `diff --git` line whose path could not be read; `+++` or
    // `rename to` lines may still supply it
    let mut unreadable_header: Option<&str> = None;
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            files.extend(current.take());
            let path = git_header_path(rest);
            if path.is_none() && unreadable_header.is_none() {
                unreadable_header = Some(line);
            }
            current = Some(FileDiff::new(path.unwrap_or_default()));
            section = Section::Header;
            continue;
        }

        if let Section::Hunk { old_left, new_left } = section {
            match consume_hunk_line(line, old_left, new_left, current.as_mut()) {
                Some((0, 0)) => section = Section::Header,
                Some((old_left, new_left)) => section = Section::Hunk { old_left, new_left },
                None => {
                    // Count mismatch; re-read the line as a header
                    section = Section::Header;
                    handle_header_line(line, &mut lines, &mut files, &mut current, &mut section);
                }
            }
            continue;
        }

        if section == Section::OpenHunk && !line.starts_with("@@") {
            if let Some(file) = current.as_mut() {
                record_change(line, file);
            }
            continue;
        }

        handle_header_line(line, &mut lines, &mut files, &mut current, &mut section);
    }
    files.extend(current);

    if files.is_empty() {
        return Err(DiffParseError::NoFileHeaders);
    }

    if files.iter().any(|f| f.path.is_empty()) {
        let header = unreadable_header.unwrap_or_default().to_string();
        return Err(DiffParseError::MalformedHeader(header));
    }

    Ok(ParsedDiff { files })
}

fn handle_header_line<'a, I>(
    line: &'a str,
    lines: &mut std::iter::Peekable<I>,
    files: &mut Vec<FileDiff>,
    current: &mut Option<FileDiff>,
    section: &mut Section,
) where
    I: Iterator<Item = &'a str>,
{
    if line.starts_with("@@") {
        *section = match parse_hunk_counts(line) {
            Some((0, 0)) => Section::Header,
            Some((old_left, new_left)) => Section::Hunk { old_left, new_left },
            None => Section::OpenHunk,
        };
        return;
    }

    if let Some(old) = line.strip_prefix("--- ") {
        let next_is_new_header = lines.peek().is_some_and(|l| l.starts_with("+++ "));
        if next_is_new_header {
            let new = lines.next().and_then(|l| l.strip_prefix("+++ ")).unwrap_or_default();
            apply_path_headers(old, new, files, current);
            return;
        }
    }

    let Some(file) = current.as_mut() else {
        return;
    };

    if let Some(new) = line.strip_prefix("+++ ") {
        if let Some(path) = strip_side_prefix(new, "b/") {
            file.path = path;
        }
    } else if line.starts_with("new file mode") {
        file.is_new = true;
    } else if line.starts_with("deleted file mode") {
        file.is_deleted = true;
    } else if let Some(from) = line.strip_prefix("rename from ") {
        file.is_renamed = true;
        file.old_path = Some(unquote(from));
    } else if let Some(to) = line.strip_prefix("rename to ") {
        file.is_renamed = true;
        file.path = unquote(to);
    } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
        file.is_binary = true;
    } else if !line.starts_with("--- ") {
        // Bare change lines without a hunk header
        record_change(line, file);
    }
}

/// Apply a `---`/`+++` pair, starting a new block for plain unified diffs.
fn apply_path_headers(
    old: &str,
    new: &str,
    files: &mut Vec<FileDiff>,
    current: &mut Option<FileDiff>,
) {
    let old_path = strip_side_prefix(old, "a/");
    let new_path = strip_side_prefix(new, "b/");

    // A git block that has not seen any hunk yet owns these headers
    let belongs_to_current = current
        .as_ref()
        .is_some_and(|f| f.changes.is_empty() && !f.is_binary);
    if !belongs_to_current {
        files.extend(current.take());
        *current = Some(FileDiff::default());
    }

    let Some(file) = current.as_mut() else {
        return;
    };
    match (old_path, new_path) {
        (None, Some(new_path)) => {
            file.is_new = true;
            file.path = new_path;
        }
        (Some(old_path), None) => {
            file.is_deleted = true;
            file.path = old_path;
        }
        (_, Some(new_path)) => file.path = new_path,
        (None, None) => {}
    }
}

/// Consume one line inside a counted hunk.
///
/// Returns the remaining counts, or `None` when the line cannot belong to
/// the hunk.
fn consume_hunk_line(
    line: &str,
    old_left: usize,
    new_left: usize,
    file: Option<&mut FileDiff>,
) -> Option<(usize, usize)> {
    match line.as_bytes().first() {
        Some(b'+') if new_left > 0 => {
            if let Some(file) = file {
                file.changes.push(ChangeLine::Added(line[1..].to_string()));
            }
            Some((old_left, new_left - 1))
        }
        Some(b'-') if old_left > 0 => {
            if let Some(file) = file {
                file.changes.push(ChangeLine::Removed(line[1..].to_string()));
            }
            Some((old_left - 1, new_left))
        }
        // Context lines; some tools strip the leading space of blank ones
        Some(b' ') | None if old_left > 0 && new_left > 0 => Some((old_left - 1, new_left - 1)),
        Some(b'\\') => Some((old_left, new_left)),
        _ => None,
    }
}

fn record_change(line: &str, file: &mut FileDiff) {
    if let Some(added) = line.strip_prefix('+') {
        file.changes.push(ChangeLine::Added(added.to_string()));
    } else if let Some(removed) = line.strip_prefix('-') {
        file.changes.push(ChangeLine::Removed(removed.to_string()));
    }
}

/// Read `(old_count, new_count)` from `@@ -a,b +c,d @@`.
fn parse_hunk_counts(line: &str) -> Option<(usize, usize)> {
    let inner = line.strip_prefix("@@ ")?;
    let end = inner.find(" @@")?;
    let mut ranges = inner[..end].split_whitespace();
    let old = range_count(ranges.next()?.strip_prefix('-')?)?;
    let new = range_count(ranges.next()?.strip_prefix('+')?)?;
    Some((old, new))
}

/// `start,count` or `start` (count of one).
fn range_count(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((start, count)) => {
            start.parse::<usize>().ok()?;
            count.parse().ok()
        }
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

/// Extract the new-side path from the text after `diff --git `.
pub(crate) fn git_header_path(rest: &str) -> Option<String> {
    let rest = rest.trim_end();

    // Unquoted identical paths: "a/<p> b/<p>"
    if rest.len() % 2 == 1 {
        let mid = rest.len() / 2;
        if rest.is_char_boundary(mid) && rest.is_char_boundary(mid + 1) {
            let (left, right) = (&rest[..mid], &rest[mid + 1..]);
            if let (Some(l), Some(r)) = (left.strip_prefix("a/"), right.strip_prefix("b/"))
                && l == r
                && !l.is_empty()
            {
                return Some(r.to_string());
            }
        }
    }

    if let Some(idx) = rest.rfind(" b/") {
        let path = &rest[idx + 3..];
        if !path.is_empty() {
            return Some(path.to_string());
        }
    }

    // Quoted paths: "\"a/x y\" \"b/x y\""
    if let Some(idx) = rest.rfind(" \"b/") {
        return Some(unquote(&rest[idx + 1..]).trim_start_matches("b/").to_string());
    }

    None
}

/// Strip `a/`/`b/` from a header path; `None` for `/dev/null`.
fn strip_side_prefix(raw: &str, prefix: &str) -> Option<String> {
    // Timestamps follow a tab in plain unified diffs
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    let raw = unquote(raw);
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix(prefix).map(str::to_string).unwrap_or(raw))
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "diff --git a/test.py b/test.py
index 1234567..abcdefg 100644
--- a/test.py
+++ b/test.py
@@ -1,3 +1,4 @@
 line1
+line2
-line3
 line4
";

    #[test]
    fn test_parse_single_file() {
        let parsed = parse_diff(SIMPLE).unwrap();
        assert_eq!(parsed.files.len(), 1);

        let file = &parsed.files[0];
        assert_eq!(file.path, "test.py");
        assert_eq!(file.added().collect::<Vec<_>>(), vec!["line2"]);
        assert_eq!(file.removed().collect::<Vec<_>>(), vec!["line3"]);
        assert!(!file.is_binary && !file.is_new && !file.is_deleted && !file.is_renamed);
    }

    #[test]
    fn test_parse_multiple_files_keeps_order() {
        let text = format!(
            "{SIMPLE}diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1 +1,2 @@
 pub mod a;
+pub mod b;
"
        );
        let parsed = parse_diff(&text).unwrap();
        let paths: Vec<&str> = parsed.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["test.py", "src/lib.rs"]);
        assert_eq!(parsed.total_added(), 2);
        assert_eq!(parsed.total_removed(), 1);
    }

    #[test]
    fn test_changes_keep_diff_order_across_hunks() {
        let text = "diff --git a/app.js b/app.js
--- a/app.js
+++ b/app.js
@@ -1,1 +1,1 @@
-const port = 80;
+const port = 8080;
@@ -9,1 +9,1 @@
-listen(port);
+app.listen(port);
";
        let parsed = parse_diff(text).unwrap();
        let changes: Vec<(char, &str)> = parsed.files[0]
            .changes
            .iter()
            .map(|c| (c.sign(), c.content()))
            .collect();
        assert_eq!(
            changes,
            vec![
                ('-', "const port = 80;"),
                ('+', "const port = 8080;"),
                ('-', "listen(port);"),
                ('+', "app.listen(port);"),
            ]
        );
    }

    #[test]
    fn test_content_lines_that_look_like_headers() {
        let text = "diff --git a/q.sql b/q.sql
--- a/q.sql
+++ b/q.sql
@@ -1,2 +1,2 @@
--- old comment
+++ new counter
 select 1;
";
        let parsed = parse_diff(text).unwrap();
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].removed().collect::<Vec<_>>(), vec!["-- old comment"]);
        assert_eq!(parsed.files[0].added().collect::<Vec<_>>(), vec!["++ new counter"]);
    }

    #[test]
    fn test_new_deleted_and_binary_flags() {
        let text = "diff --git a/new.txt b/new.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new.txt
@@ -0,0 +1 @@
+hello
diff --git a/old.txt b/old.txt
deleted file mode 100644
--- a/old.txt
+++ /dev/null
@@ -1 +0,0 @@
-bye
diff --git a/logo.png b/logo.png
Binary files a/logo.png and b/logo.png differ
";
        let parsed = parse_diff(text).unwrap();
        assert_eq!(parsed.files.len(), 3);
        assert!(parsed.files[0].is_new);
        assert_eq!(parsed.files[0].added().collect::<Vec<_>>(), vec!["hello"]);
        assert!(parsed.files[1].is_deleted);
        assert_eq!(parsed.files[1].path, "old.txt");
        assert_eq!(parsed.files[1].removed().collect::<Vec<_>>(), vec!["bye"]);
        assert!(parsed.files[2].is_binary);
        assert_eq!(parsed.files[2].path, "logo.png");
    }

    #[test]
    fn test_rename() {
        let text = "diff --git a/old name.rs b/new name.rs
similarity index 90%
rename from old name.rs
rename to new name.rs
";
        let parsed = parse_diff(text).unwrap();
        let file = &parsed.files[0];
        assert!(file.is_renamed);
        assert_eq!(file.path, "new name.rs");
        assert_eq!(file.old_path.as_deref(), Some("old name.rs"));
    }

    #[test]
    fn test_paths_with_spaces() {
        let text = "diff --git a/my file.txt b/my file.txt\n+x\n";
        let parsed = parse_diff(text).unwrap();
        assert_eq!(parsed.files[0].path, "my file.txt");
    }

    #[test]
    fn test_bare_change_lines_without_hunk_header() {
        let changes: String = (0..5).map(|i| format!("+line{i}\n")).collect();
        let text = format!("diff --git a/test.py b/test.py\n{changes}");
        let parsed = parse_diff(&text).unwrap();
        assert_eq!(parsed.files[0].added_count(), 5);
    }

    #[test]
    fn test_plain_unified_diff() {
        let text = "--- a/main.c\t2024-01-01 00:00:00\n+++ b/main.c\t2024-01-02 00:00:00\n@@ -1 +1 @@\n-int x;\n+long x;\n";
        let parsed = parse_diff(text).unwrap();
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].path, "main.c");
        assert_eq!(parsed.files[0].added().collect::<Vec<_>>(), vec!["long x;"]);
    }

    #[test]
    fn test_unreadable_hunk_header_still_collects_changes() {
        let text = "diff --git a/a.rs b/a.rs\n@@ garbage @@\n+one\n-two\n";
        let parsed = parse_diff(text).unwrap();
        assert_eq!(parsed.files[0].added().collect::<Vec<_>>(), vec!["one"]);
        assert_eq!(parsed.files[0].removed().collect::<Vec<_>>(), vec!["two"]);
    }

    #[test]
    fn test_prose_is_not_a_diff() {
        assert_eq!(
            parse_diff("This is just some prose.\nNothing to see here."),
            Err(DiffParseError::NoFileHeaders)
        );
        assert_eq!(parse_diff(""), Err(DiffParseError::NoFileHeaders));
    }

    #[test]
    fn test_header_without_path_is_malformed() {
        let result = parse_diff("diff --git garbage\n+x\n");
        assert!(matches!(result, Err(DiffParseError::MalformedHeader(_))));
    }

    #[test]
    fn test_parse_hunk_counts() {
        assert_eq!(parse_hunk_counts("@@ -1,3 +1,4 @@"), Some((3, 4)));
        assert_eq!(parse_hunk_counts("@@ -1 +1 @@ fn main()"), Some((1, 1)));
        assert_eq!(parse_hunk_counts("@@ -0,0 +1,2 @@"), Some((0, 2)));
        assert_eq!(parse_hunk_counts("@@ nonsense @@"), None);
    }
}

//! Staged (index vs HEAD) diff collection.

use std::fmt;

use git2::{Delta, Diff, DiffFormat, ErrorCode, Repository, Tree};
use tracing::debug;

use crate::error::GitError;

/// Status of a staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
        }
    }
}

/// A file with staged changes.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files.
    pub old_path: Option<String>,
}

/// Staged changes as unified patch text plus per-file status.
#[derive(Debug, Clone, Default)]
pub struct StagedDiff {
    pub text: String,
    pub files: Vec<ChangedFile>,
    pub additions: usize,
    pub deletions: usize,
}

impl StagedDiff {
    /// Nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Resolve the HEAD tree.
///
/// Returns `Ok(None)` for repositories without commits, so the first commit
/// diffs against the empty tree.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::DiffFailed)?;
    Ok(Some(tree))
}

/// Collect the staged diff, equivalent to `git diff --staged`.
///
/// An empty index diff yields an empty [`StagedDiff`], not an error.
pub fn staged_diff(repo: &Repository) -> Result<StagedDiff, GitError> {
    let head_tree = resolve_head_tree(repo)?;
    let mut diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(GitError::DiffFailed)?;
    diff.find_similar(None).map_err(GitError::DiffFailed)?;

    let files = collect_files(&diff);
    let mut staged = StagedDiff {
        files,
        ..Default::default()
    };
    append_patch_text(&diff, &mut staged)?;

    debug!(
        files = staged.files.len(),
        additions = staged.additions,
        deletions = staged.deletions,
        "Collected staged diff"
    );
    Ok(staged)
}

fn collect_files(diff: &Diff<'_>) -> Vec<ChangedFile> {
    diff.deltas()
        .filter_map(|delta| {
            let status = match delta.status() {
                Delta::Added | Delta::Untracked | Delta::Copied => FileStatus::Added,
                Delta::Deleted => FileStatus::Deleted,
                Delta::Renamed => FileStatus::Renamed,
                _ => FileStatus::Modified,
            };

            let new_path = delta.new_file().path().map(|p| p.to_string_lossy().to_string());
            let old_path = delta.old_file().path().map(|p| p.to_string_lossy().to_string());

            let (path, old_path) = match status {
                FileStatus::Renamed => (new_path.clone().or(old_path.clone())?, old_path),
                _ => (new_path.or(old_path)?, None),
            };

            Some(ChangedFile {
                path,
                status,
                old_path,
            })
        })
        .collect()
}

/// Render the diff as `git diff` patch text and count changed lines.
fn append_patch_text(diff: &Diff<'_>, staged: &mut StagedDiff) -> Result<(), GitError> {
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        match origin {
            '+' => staged.additions += 1,
            '-' => staged.deletions += 1,
            _ => {}
        }

        if matches!(origin, '+' | '-' | ' ') {
            staged.text.push(origin);
        }
        staged.text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(GitError::DiffFailed)
}

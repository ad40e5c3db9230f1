//! Committing the index.

use git2::{ErrorCode, Oid, Repository};
use tracing::debug;

use crate::error::GitError;

/// Commit the current index with `message`, like `git commit -m`.
///
/// Only what is already staged is committed. The author and committer come
/// from git config. Works on an unborn branch, creating the root commit.
/// Hooks are not run.
pub fn commit_staged(repo: &Repository, message: &str) -> Result<Oid, GitError> {
    let mut index = repo.index().map_err(GitError::CommitFailed)?;
    let tree_id = index.write_tree().map_err(GitError::CommitFailed)?;
    let tree = repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

    let sig = repo.signature().map_err(GitError::ConfigError)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(GitError::CommitFailed)?),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(GitError::CommitFailed(e)),
    };
    let parents: Vec<_> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(GitError::CommitFailed)?;

    debug!(%oid, "Created commit");
    Ok(oid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn init_repo_with_identity() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        (dir, repo)
    }

    fn stage(repo: &Repository, dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    #[test]
    fn test_root_commit_on_unborn_branch() {
        let (dir, repo) = init_repo_with_identity();
        stage(&repo, dir.path(), "a.txt", "a\n");

        let oid = commit_staged(&repo, "feat: initial commit").unwrap();
        let commit = repo.find_commit(oid).unwrap();
        assert_eq!(commit.message(), Some("feat: initial commit"));
        assert_eq!(commit.parent_count(), 0);
        assert_eq!(commit.author().name(), Some("Test"));
    }

    #[test]
    fn test_commit_has_head_as_parent() {
        let (dir, repo) = init_repo_with_identity();
        stage(&repo, dir.path(), "a.txt", "a\n");
        let first = commit_staged(&repo, "chore: first").unwrap();

        stage(&repo, dir.path(), "b.txt", "b\n");
        let second = commit_staged(&repo, "feat: second").unwrap();

        let commit = repo.find_commit(second).unwrap();
        assert_eq!(commit.parent_id(0).unwrap(), first);
        assert!(commit.tree().unwrap().get_path(Path::new("b.txt")).is_ok());
    }

    #[test]
    fn test_unstaged_changes_are_not_committed() {
        let (dir, repo) = init_repo_with_identity();
        stage(&repo, dir.path(), "a.txt", "a\n");
        std::fs::write(dir.path().join("loose.txt"), "not staged\n").unwrap();

        let oid = commit_staged(&repo, "feat: add a").unwrap();
        let tree = repo.find_commit(oid).unwrap().tree().unwrap();
        assert!(tree.get_path(Path::new("loose.txt")).is_err());
    }
}

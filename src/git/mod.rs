//! Git operations using git2-rs.

pub mod commit;
pub mod staged;

pub use commit::commit_staged;
pub use staged::{ChangedFile, FileStatus, StagedDiff, staged_diff};

use git2::Repository;

use crate::error::GitError;

/// Open the repository containing the current directory.
pub fn open_repository() -> Result<Repository, GitError> {
    Repository::open_from_env().map_err(GitError::OpenRepository)
}

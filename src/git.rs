//! Staged changes as unified diff text.

use std::path::Path;

use git2::{DiffFormat, DiffOptions, ErrorCode, Repository, Tree};
use tracing::debug;

use crate::error::DiffError;

/// Resolve the HEAD tree; `None` for a repository without commits.
fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, DiffError> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(DiffError::DiffFailed(e)),
    };
    head.peel_to_tree().map(Some).map_err(DiffError::DiffFailed)
}

/// Unified diff of the index against HEAD. Unstaged work is ignored.
///
/// Fails with [`DiffError::NoStagedChanges`] when nothing is staged.
pub fn staged_diff(repo: &Repository) -> Result<String, DiffError> {
    let tree = head_tree(repo)?;
    let mut opts = DiffOptions::new();
    opts.context_lines(3);
    let diff = repo
        .diff_tree_to_index(tree.as_ref(), None, Some(&mut opts))
        .map_err(DiffError::DiffFailed)?;

    if diff.deltas().len() == 0 {
        return Err(DiffError::NoStagedChanges);
    }

    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        if matches!(origin, '+' | '-' | ' ') {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(DiffError::DiffFailed)?;

    debug!(files = diff.deltas().len(), bytes = text.len(), "Collected staged diff");
    Ok(text)
}

/// Open the repository containing `path` and read its staged diff.
pub fn staged_diff_at(path: &Path) -> Result<String, DiffError> {
    let repo = Repository::discover(path).map_err(DiffError::OpenRepository)?;
    staged_diff(&repo)
}

//! Publishing the rebuilt target branch.

use std::path::Path;

use super::{GitResult, GitRunner, run_checked};

/// Force-pushes `target_branch` to `origin`.
///
/// The target branch is rebuilt from scratch on every run, so the remote copy
/// is always overwritten.
pub fn force_push<G: GitRunner + ?Sized>(
    git: &G,
    workdir: &Path,
    target_branch: &str,
) -> GitResult<()> {
    run_checked(git, workdir, &["push", "origin", target_branch, "--force"])?;
    Ok(())
}

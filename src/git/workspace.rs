//! Per-project working copies.
//!
//! Each project gets one working copy at `<root>/project-<id>`. The copy is
//! disposable automation state: it is reused between runs to save a full
//! clone, but whenever local state disagrees with the remote, the remote wins.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{ProjectId, RepoInfo};

use super::{GitError, GitRunner, run_checked};

/// A preparation step failed. Carries the git output of the failing step.
#[derive(Debug, Error)]
#[error("error {step}: {source}")]
pub struct WorkspaceError {
    pub step: &'static str,
    #[source]
    pub source: GitError,
}

trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, WorkspaceError>;
}

impl<T, E: Into<GitError>> StepContext<T> for Result<T, E> {
    fn step(self, step: &'static str) -> Result<T, WorkspaceError> {
        self.map_err(|e| WorkspaceError {
            step,
            source: e.into(),
        })
    }
}

/// How the working copy was brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    /// No usable copy existed; a fresh clone was made.
    Cloned,

    /// An existing copy was cleaned and pulled.
    Refreshed {
        /// The pull left local divergence behind and the default branch was
        /// hard-reset to the remote tip.
        reset_to_remote: bool,
    },
}

/// How the target branch was checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCheckout {
    /// The branch did not exist locally and was created from the default tip.
    Created,

    /// A local branch from a previous run was reused and reset to the
    /// default tip.
    Resumed,
}

/// Outcome of [`prepare_workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared {
    pub checkout: Checkout,
    pub target: TargetCheckout,
}

/// Returns the working copy location for a project.
pub fn workspace_path(root: &Path, project: ProjectId) -> PathBuf {
    root.join(format!("project-{}", project.0))
}

/// Makes sure `path` holds a working copy of `repo` with `target_branch` checked out.
///
/// - No copy: clone at the default branch.
/// - Existing copy: discard local modifications, fetch everything, check out
///   and pull the default branch, then hard-reset to `origin/<default>` if the
///   pull fails or the copy still reports local changes.
/// - Target branch: reuse it if it exists locally, otherwise create it. Either
///   way it starts from the default tip, so every run rebuilds it.
pub fn prepare_workspace<G: GitRunner + ?Sized>(
    git: &G,
    path: &Path,
    repo: &RepoInfo,
    target_branch: &str,
) -> Result<Prepared, WorkspaceError> {
    let checkout = if path.join(".git").exists() {
        refresh(git, path, &repo.default_branch)?
    } else {
        clone(git, path, repo)?;
        Checkout::Cloned
    };

    let target = checkout_target(git, path, &repo.default_branch, target_branch)?;

    Ok(Prepared { checkout, target })
}

fn clone<G: GitRunner + ?Sized>(
    git: &G,
    path: &Path,
    repo: &RepoInfo,
) -> Result<(), WorkspaceError> {
    if path.exists() {
        tracing::info!(path = %path.display(), "removing stale workspace directory");
        std::fs::remove_dir_all(path).step("removing stale workspace")?;
    }

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).step("creating workspace root")?;

    // Git runs inside `parent`, so the destination must be relative to it.
    let dest = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();

    tracing::info!(path = %path.display(), branch = %repo.default_branch, "cloning repository");
    run_checked(
        git,
        parent,
        &[
            "clone",
            "--branch",
            &repo.default_branch,
            "--",
            &repo.clone_url,
            &dest,
        ],
    )
    .step("cloning repo")?;

    Ok(())
}

fn refresh<G: GitRunner + ?Sized>(
    git: &G,
    path: &Path,
    default_branch: &str,
) -> Result<Checkout, WorkspaceError> {
    tracing::info!(path = %path.display(), "refreshing existing workspace");

    // Also clears a merge left half-done by a crashed run.
    run_checked(git, path, &["reset", "--hard"]).step("discarding local changes")?;
    run_checked(git, path, &["clean", "-fd"]).step("removing untracked files")?;
    run_checked(git, path, &["fetch", "--all", "--prune"]).step("fetching remote refs")?;
    run_checked(git, path, &["checkout", default_branch]).step("checking out default branch")?;

    // A rewritten remote branch can make the pull conflict. The reset below
    // also clears the half-done merge it leaves.
    let pulled = run_checked(
        git,
        path,
        &["pull", "--no-rebase", "--no-edit", "origin", default_branch],
    );

    let reset_to_remote = match pulled {
        Ok(_) => {
            let status = run_checked(git, path, &["status", "--porcelain", "--branch"])
                .step("reading workspace status")?;
            has_local_changes(&status.output)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                branch = %default_branch,
                error = %e,
                "pull failed"
            );
            true
        }
    };

    if reset_to_remote {
        tracing::warn!(
            path = %path.display(),
            branch = %default_branch,
            "default branch diverged from remote, resetting"
        );
        let remote_tip = format!("origin/{default_branch}");
        run_checked(git, path, &["reset", "--hard", &remote_tip])
            .step("resetting to remote default branch")?;
    }

    Ok(Checkout::Refreshed { reset_to_remote })
}

/// Interprets `git status --porcelain --branch`: any file entry, or a branch
/// header saying the local branch is ahead of its upstream.
fn has_local_changes(status: &str) -> bool {
    status.lines().any(|line| match line.strip_prefix("## ") {
        Some(header) => header.contains("[ahead") || header.contains(", ahead"),
        None => !line.trim().is_empty(),
    })
}

fn checkout_target<G: GitRunner + ?Sized>(
    git: &G,
    path: &Path,
    default_branch: &str,
    target_branch: &str,
) -> Result<TargetCheckout, WorkspaceError> {
    let local_ref = format!("refs/heads/{target_branch}");
    let exists = git
        .run(path, &["rev-parse", "--verify", "--quiet", &local_ref])
        .step("looking up target branch")?
        .is_success();

    if exists {
        run_checked(git, path, &["checkout", "-B", target_branch, default_branch])
            .step("resetting target branch to default branch")?;
        Ok(TargetCheckout::Resumed)
    } else {
        run_checked(git, path, &["checkout", "-b", target_branch])
            .step("creating target branch from default branch")?;
        Ok(TargetCheckout::Created)
    }
}

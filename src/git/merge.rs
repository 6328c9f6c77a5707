//! Merging a single MR head into the target branch.
//!
//! Each MR goes through three steps: fetch its head into `mr-<iid>`, check
//! out the target branch, and merge with `--no-ff`. A failed merge is aborted
//! so the next MR starts from a clean tree.

use std::path::Path;

use thiserror::Error;

use crate::types::{MergeRequest, MrIid};

use super::{GitError, GitRunner, run_checked};

/// Which step of merging an MR failed.
///
/// The `Display` text is the report line for the failure.
#[derive(Debug, Error)]
pub enum MergeFailure {
    #[error("Error fetching MR {iid}: {source}")]
    Fetch {
        iid: MrIid,
        #[source]
        source: GitError,
    },

    #[error("Error checking out branch: {source}")]
    Checkout {
        #[source]
        source: GitError,
    },

    #[error("Error merging MR {iid}: {source}")]
    Merge {
        iid: MrIid,
        #[source]
        source: GitError,
    },
}

/// Commit message of the merge commit for `mr`.
pub fn merge_message(mr: &MergeRequest) -> String {
    format!("Merge MR {}: {}", mr.iid, mr.title)
}

/// Fetches `mr`'s head and merges it into `target_branch` with a merge commit.
pub fn merge_request<G: GitRunner + ?Sized>(
    git: &G,
    workdir: &Path,
    target_branch: &str,
    mr: &MergeRequest,
) -> Result<(), MergeFailure> {
    let iid = mr.iid;
    let local_branch = iid.local_branch();

    // Forced so a rewritten MR head replaces the branch left by an earlier run.
    let refspec = format!("+{}:{}", iid.head_ref(), local_branch);
    run_checked(git, workdir, &["fetch", "origin", &refspec])
        .map_err(|source| MergeFailure::Fetch { iid, source })?;

    run_checked(git, workdir, &["checkout", target_branch])
        .map_err(|source| MergeFailure::Checkout { source })?;

    let message = merge_message(mr);
    if let Err(source) = run_checked(
        git,
        workdir,
        &["merge", "--no-ff", "-m", &message, &local_branch],
    ) {
        abort_merge(git, workdir);
        return Err(MergeFailure::Merge { iid, source });
    }

    Ok(())
}

/// Best effort: there may be no merge in progress if git failed early.
fn abort_merge<G: GitRunner + ?Sized>(git: &G, workdir: &Path) {
    match git.run(workdir, &["merge", "--abort"]) {
        Ok(out) if out.is_success() => {}
        Ok(out) => {
            tracing::debug!(output = %out.output.trim_end(), "merge --abort had nothing to abort");
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to run merge --abort");
        }
    }
}

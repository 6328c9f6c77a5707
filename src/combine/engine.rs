//! State machine for one combination run.
//!
//! ```text
//! FetchingRepoInfo -> PreparingWorkspace -> CheckingBranchConflict
//!     -> FetchingRequests -> MergingEach(0..n) -> Pushing -> Reporting -> Done
//! ```
//!
//! Any stage may jump straight to `Reporting` with the run marked failed,
//! except `MergingEach`: a failed MR is reported and the run moves on to the
//! next one. `Reporting` is reached exactly once per run.
//!
//! Git steps are blocking process calls and run on tokio's blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::instrument;

use crate::git::merge::merge_request;
use crate::git::push::force_push;
use crate::git::workspace::{prepare_workspace, workspace_path};
use crate::git::{GitError, GitRunner};
use crate::gitlab::GitLabApi;
use crate::report::RunReport;
use crate::types::{CombineTrigger, MergeRequest, MrIid, RepoInfo};

use super::notify;

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchingRepoInfo,
    PreparingWorkspace,
    CheckingBranchConflict,
    FetchingRequests,
    /// Merging the MR at this index of the listing.
    MergingEach(usize),
    Pushing,
    /// Posting the report note.
    Reporting,
    Done,
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Any step failed.
    pub failed: bool,

    /// MRs merged into the target branch, in merge order.
    pub merged: Vec<MrIid>,

    /// The target branch was pushed.
    pub pushed: bool,

    /// The report note was posted.
    pub reported: bool,
}

/// Mutable state threaded through the stages of one run.
struct Run {
    trigger: CombineTrigger,
    target_branch: String,
    /// Taken when the report is posted.
    report: Option<RunReport>,
    workdir: PathBuf,
    repo: Option<RepoInfo>,
    requests: Vec<MergeRequest>,
    merged: Vec<MrIid>,
    pushed: bool,
    failed: bool,
    reported: bool,
}

impl Run {
    fn line(&self, message: impl Into<String>) {
        if let Some(report) = &self.report {
            report.line(message);
        }
    }

    /// Records a fatal error and ends the run.
    fn abort(&mut self, message: impl Into<String>) -> Stage {
        self.fail(message);
        Stage::Reporting
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.line(message);
        self.failed = true;
    }
}

/// Runs combinations for any project, sharing one API client and git runner.
pub struct Combiner<A, G> {
    api: Arc<A>,
    git: Arc<G>,
    workspace_root: PathBuf,
    label: String,
}

impl<A, G> Clone for Combiner<A, G> {
    fn clone(&self) -> Self {
        Combiner {
            api: Arc::clone(&self.api),
            git: Arc::clone(&self.git),
            workspace_root: self.workspace_root.clone(),
            label: self.label.clone(),
        }
    }
}

impl<A: GitLabApi, G: GitRunner> Combiner<A, G> {
    /// `label` selects the MRs to combine.
    pub fn new(
        api: Arc<A>,
        git: Arc<G>,
        workspace_root: impl Into<PathBuf>,
        label: impl Into<String>,
    ) -> Self {
        Combiner {
            api,
            git,
            workspace_root: workspace_root.into(),
            label: label.into(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Runs one combination to completion and posts its report on the
    /// triggering MR.
    #[instrument(
        skip_all,
        fields(
            project = %report.key().project,
            request = %report.key().request,
            branch = %target_branch,
        )
    )]
    pub async fn run(&self, report: RunReport, target_branch: String) -> RunOutcome {
        let trigger = report.key();
        let mut run = Run {
            trigger,
            workdir: workspace_path(&self.workspace_root, trigger.project),
            target_branch,
            report: Some(report),
            repo: None,
            requests: Vec::new(),
            merged: Vec::new(),
            pushed: false,
            failed: false,
            reported: false,
        };

        tracing::info!("combination started");

        let mut stage = Stage::FetchingRepoInfo;
        while stage != Stage::Done {
            tracing::debug!(?stage, "entering stage");
            stage = self.advance(stage, &mut run).await;
        }

        let outcome = RunOutcome {
            failed: run.failed,
            merged: run.merged,
            pushed: run.pushed,
            reported: run.reported,
        };
        tracing::info!(
            failed = outcome.failed,
            merged = outcome.merged.len(),
            pushed = outcome.pushed,
            "combination finished"
        );
        outcome
    }

    async fn advance(&self, stage: Stage, run: &mut Run) -> Stage {
        match stage {
            Stage::FetchingRepoInfo => self.fetch_repo_info(run).await,
            Stage::PreparingWorkspace => self.prepare(run).await,
            Stage::CheckingBranchConflict => Self::check_branch_conflict(run),
            Stage::FetchingRequests => self.fetch_requests(run).await,
            Stage::MergingEach(index) => self.merge_each(run, index).await,
            Stage::Pushing => self.push(run).await,
            Stage::Reporting => self.report(run).await,
            Stage::Done => Stage::Done,
        }
    }

    async fn fetch_repo_info(&self, run: &mut Run) -> Stage {
        match self.api.project(run.trigger.project).await {
            Ok(repo) => {
                run.line(format!(
                    "Repo Info: Branch={}, URL={}",
                    repo.default_branch, repo.clone_url
                ));
                run.repo = Some(repo);
                Stage::PreparingWorkspace
            }
            Err(e) => run.abort(format!("Error fetching repo info: {e}")),
        }
    }

    async fn prepare(&self, run: &mut Run) -> Stage {
        let Some(repo) = run.repo.clone() else {
            return run.abort("Error fetching repo info: no project metadata");
        };
        let path = run.workdir.clone();
        let target = run.target_branch.clone();

        let result = self
            .with_git(move |git| prepare_workspace(git, &path, &repo, &target))
            .await;

        match result {
            Ok(Ok(prepared)) => {
                tracing::debug!(?prepared, "workspace ready");
                Stage::CheckingBranchConflict
            }
            Ok(Err(e)) => run.abort(e.to_string()),
            Err(e) => run.abort(e.to_string()),
        }
    }

    fn check_branch_conflict(run: &mut Run) -> Stage {
        let is_default = run
            .repo
            .as_ref()
            .is_some_and(|repo| repo.default_branch == run.target_branch);

        if is_default {
            run.abort("Target branch is the same as the default branch")
        } else {
            Stage::FetchingRequests
        }
    }

    async fn fetch_requests(&self, run: &mut Run) -> Stage {
        match self
            .api
            .labeled_merge_requests(run.trigger.project, &self.label)
            .await
        {
            Ok(requests) => {
                run.line(format!("Found {} MRs", requests.len()));
                run.requests = requests;
                Stage::MergingEach(0)
            }
            Err(e) => run.abort(format!("Error fetching MRs: {e}")),
        }
    }

    async fn merge_each(&self, run: &mut Run, index: usize) -> Stage {
        let Some(mr) = run.requests.get(index).cloned() else {
            return Stage::Pushing;
        };
        let path = run.workdir.clone();
        let target = run.target_branch.clone();
        let request = mr.clone();

        let result = self
            .with_git(move |git| merge_request(git, &path, &target, &request))
            .await;

        match result {
            Ok(Ok(())) => {
                run.line(format!("Merged MR {}: {}", mr.iid, mr.title));
                run.merged.push(mr.iid);
            }
            Ok(Err(e)) => run.fail(e.to_string()),
            Err(e) => run.fail(format!("Error merging MR {}: {e}", mr.iid)),
        }

        Stage::MergingEach(index + 1)
    }

    async fn push(&self, run: &mut Run) -> Stage {
        let path = run.workdir.clone();
        let target = run.target_branch.clone();

        let result = self
            .with_git(move |git| force_push(git, &path, &target))
            .await
            .and_then(|pushed| pushed);

        match result {
            Ok(()) => {
                run.pushed = true;
                run.line(format!("Merged MRs into {}", run.target_branch));
                Stage::Reporting
            }
            Err(e) => run.abort(format!("Error pushing to remote: {e}")),
        }
    }

    async fn report(&self, run: &mut Run) -> Stage {
        let status = notify::status_line(&run.target_branch, run.failed);
        let body = run.report.take().and_then(RunReport::finish);
        run.reported = notify::post_report(self.api.as_ref(), run.trigger, &status, body).await;
        Stage::Done
    }

    /// Runs `f` against the git runner on the blocking pool.
    async fn with_git<T, F>(&self, f: F) -> Result<T, GitError>
    where
        F: FnOnce(&G) -> T + Send + 'static,
        T: Send + 'static,
    {
        let git = Arc::clone(&self.git);
        Ok(tokio::task::spawn_blocking(move || f(git.as_ref())).await?)
    }
}

//! Local git operations for the combination run.
//!
//! This module implements the git side of a run:
//! - Workspace management (clone or refresh a per-project working copy)
//! - Merge operations (fetch an MR head, `--no-ff` merge into the target branch)
//! - Push (force-push the rebuilt target branch)
//!
//! Every git invocation goes through the [`GitRunner`] capability, which
//! returns a structured [`CommandOutput`] (exit code plus combined output).
//! The production implementation, [`SystemGit`], shells out to the `git`
//! binary; tests substitute scripted runners.

pub mod merge;
pub mod push;
pub mod workspace;

#[cfg(test)]
pub(crate) mod fixture;

use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git ran and exited non-zero.
    #[error("{command} failed (exit {}), output: {output}", display_code(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// Git could not be started, or the filesystem refused a workspace operation.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task running git panicked or was cancelled.
    #[error("git task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// What a finished git process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,

    /// Stdout followed by stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn success(output: impl Into<String>) -> Self {
        CommandOutput {
            code: Some(0),
            output: output.into(),
        }
    }

    pub fn failure(code: i32, output: impl Into<String>) -> Self {
        CommandOutput {
            code: Some(code),
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run git in a directory.
///
/// A non-zero exit is not an `Err`: it comes back as a [`CommandOutput`] so
/// callers can inspect it. `Err` is reserved for git not running at all.
pub trait GitRunner: Send + Sync + 'static {
    fn run(&self, workdir: &Path, args: &[&str]) -> GitResult<CommandOutput>;
}

/// Runs git and turns a non-zero exit into [`GitError::CommandFailed`].
pub fn run_checked<G: GitRunner + ?Sized>(
    git: &G,
    workdir: &Path,
    args: &[&str],
) -> GitResult<CommandOutput> {
    let out = git.run(workdir, args)?;
    if out.is_success() {
        Ok(out)
    } else {
        Err(GitError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            code: out.code,
            output: out.output.trim_end().to_string(),
        })
    }
}

/// Identity used for merge commits.
///
/// Passed via `-c` flags on every invocation instead of being written to the
/// global git config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    /// Git `user.name`.
    pub name: String,

    /// Git `user.email`.
    pub email: String,
}

/// [`GitRunner`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct SystemGit {
    identity: CommitIdentity,
}

impl SystemGit {
    pub fn new(identity: CommitIdentity) -> Self {
        SystemGit { identity }
    }

    /// Create a git Command with clean environment and the commit identity.
    ///
    /// System and user configuration are ignored (hooks, aliases, rerere), and
    /// terminal prompts are disabled so a credential prompt fails instead of
    /// hanging the run.
    fn command(&self, workdir: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(workdir);

        cmd.env("GIT_CONFIG_NOSYSTEM", "1");
        cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        cmd.arg("-c");
        cmd.arg(format!("user.name={}", self.identity.name));
        cmd.arg("-c");
        cmd.arg(format!("user.email={}", self.identity.email));

        cmd
    }
}

impl GitRunner for SystemGit {
    fn run(&self, workdir: &Path, args: &[&str]) -> GitResult<CommandOutput> {
        let output = self.command(workdir).args(args).output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        tracing::debug!(
            workdir = %workdir.display(),
            command = %args.join(" "),
            code = ?output.status.code(),
            "git finished"
        );

        Ok(CommandOutput {
            code: output.status.code(),
            output: combined,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGit;
    use super::*;
    use tempfile::TempDir;

    fn test_git() -> SystemGit {
        SystemGit::new(CommitIdentity {
            name: "Test".to_string(),
            email: "test@test.com".to_string(),
        })
    }

    #[test]
    fn run_checked_passes_through_success() {
        let git = ScriptedGit::new().respond_to("status", "clean");
        let out = run_checked(&git, Path::new("/repo"), &["status"]).unwrap();
        assert!(out.is_success());
        assert_eq!(out.output, "clean");
    }

    #[test]
    fn run_checked_reports_command_and_output() {
        let git = ScriptedGit::new().fail_on("merge", "CONFLICT (content)\n");
        let err = run_checked(&git, Path::new("/repo"), &["merge", "--no-ff", "mr-2"]).unwrap_err();

        match &err {
            GitError::CommandFailed {
                command,
                code,
                output,
            } => {
                assert_eq!(command, "git merge --no-ff mr-2");
                assert_eq!(*code, Some(1));
                assert_eq!(output, "CONFLICT (content)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "git merge --no-ff mr-2 failed (exit 1), output: CONFLICT (content)"
        );
    }

    #[test]
    fn system_git_captures_exit_code_and_combined_output() {
        let dir = TempDir::new().unwrap();
        let git = test_git();

        let ok = git.run(dir.path(), &["init", "-b", "main"]).unwrap();
        assert!(ok.is_success());

        let bad = git
            .run(dir.path(), &["rev-parse", "--verify", "refs/heads/nope"])
            .unwrap();
        assert!(!bad.is_success());
        assert!(bad.code.is_some());
    }

    #[test]
    fn system_git_applies_commit_identity() {
        let dir = TempDir::new().unwrap();
        let git = test_git();

        run_checked(&git, dir.path(), &["init", "-b", "main"]).unwrap();
        let name = run_checked(&git, dir.path(), &["config", "user.name"]).unwrap();
        let email = run_checked(&git, dir.path(), &["config", "user.email"]).unwrap();

        assert_eq!(name.output.trim(), "Test");
        assert_eq!(email.output.trim(), "test@test.com");
    }
}

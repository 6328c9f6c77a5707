//! A local bare repository standing in for a GitLab project.
//!
//! The bare repo is the "origin" a workspace clones from. A separate seed
//! working copy publishes commits to `main` and MR heads under
//! `refs/merge-requests/<iid>/head`, the way GitLab exposes them.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::{CommitIdentity, GitRunner, SystemGit, run_checked};

pub struct RemoteFixture {
    dir: TempDir,
    git: SystemGit,
}

impl RemoteFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let git = SystemGit::new(CommitIdentity {
            name: "Test".to_string(),
            email: "test@test.com".to_string(),
        });
        let fixture = RemoteFixture { dir, git };

        let root = fixture.dir.path();
        run_checked(&fixture.git, root, &["init", "--bare", "-b", "main", "remote.git"]).unwrap();

        let seed = fixture.seed();
        std::fs::create_dir_all(&seed).unwrap();
        run_checked(&fixture.git, &seed, &["init", "-b", "main"]).unwrap();
        std::fs::write(seed.join("README.md"), "# Test").unwrap();
        run_checked(&fixture.git, &seed, &["add", "."]).unwrap();
        run_checked(&fixture.git, &seed, &["commit", "-m", "Initial commit"]).unwrap();
        run_checked(&fixture.git, &seed, &["remote", "add", "origin", &fixture.url()]).unwrap();
        run_checked(&fixture.git, &seed, &["push", "origin", "main"]).unwrap();

        fixture
    }

    pub fn git(&self) -> SystemGit {
        self.git.clone()
    }

    /// Clone URL of the bare repository.
    pub fn url(&self) -> String {
        self.bare().to_string_lossy().into_owned()
    }

    fn bare(&self) -> PathBuf {
        self.dir.path().join("remote.git")
    }

    fn seed(&self) -> PathBuf {
        self.dir.path().join("seed")
    }

    fn commit_file(&self, file: &str, content: &str, message: &str) {
        let seed = self.seed();
        std::fs::write(seed.join(file), content).unwrap();
        run_checked(&self.git, &seed, &["add", "."]).unwrap();
        run_checked(&self.git, &seed, &["commit", "-m", message]).unwrap();
    }

    /// Adds a commit to the remote default branch.
    pub fn commit_to_main(&self, file: &str, content: &str) {
        let seed = self.seed();
        run_checked(&self.git, &seed, &["checkout", "main"]).unwrap();
        self.commit_file(file, content, &format!("Update {file}"));
        run_checked(&self.git, &seed, &["push", "origin", "main"]).unwrap();
    }

    /// Force-pushes a replacement for the tip commit of the remote `main`.
    pub fn rewrite_main(&self, file: &str, content: &str) {
        let seed = self.seed();
        run_checked(&self.git, &seed, &["checkout", "main"]).unwrap();
        run_checked(&self.git, &seed, &["reset", "--hard", "HEAD~1"]).unwrap();
        self.commit_file(file, content, &format!("Rewrite {file}"));
        run_checked(&self.git, &seed, &["push", "--force", "origin", "main"]).unwrap();
    }

    /// Publishes an MR head branched off the current remote `main`.
    pub fn publish_mr(&self, iid: u64, file: &str, content: &str) {
        let seed = self.seed();
        let source = format!("source-{iid}");
        run_checked(&self.git, &seed, &["checkout", "-B", &source, "main"]).unwrap();
        self.commit_file(file, content, &format!("Change for MR {iid}"));
        let refspec = format!("HEAD:refs/merge-requests/{iid}/head");
        run_checked(&self.git, &seed, &["push", "--force", "origin", &refspec]).unwrap();
        run_checked(&self.git, &seed, &["checkout", "main"]).unwrap();
    }

    /// Resolves `rev` inside `repo`.
    pub fn rev(&self, repo: &Path, rev: &str) -> String {
        run_checked(&self.git, repo, &["rev-parse", rev])
            .unwrap()
            .output
            .trim()
            .to_string()
    }

    pub fn current_branch(&self, repo: &Path) -> String {
        run_checked(&self.git, repo, &["rev-parse", "--abbrev-ref", "HEAD"])
            .unwrap()
            .output
            .trim()
            .to_string()
    }

    /// Whether `branch` exists on the remote.
    pub fn has_branch(&self, branch: &str) -> bool {
        let local_ref = format!("refs/heads/{branch}");
        self.git
            .run(&self.bare(), &["rev-parse", "--verify", "--quiet", &local_ref])
            .unwrap()
            .is_success()
    }

    /// First-parent commit subjects on a remote branch, tip first.
    pub fn subjects(&self, branch: &str) -> Vec<String> {
        run_checked(
            &self.git,
            &self.bare(),
            &["log", "--first-parent", "--format=%s", branch],
        )
            .unwrap()
            .output
            .lines()
            .map(str::to_string)
            .collect()
    }
}

//! Newtype wrappers for GitLab identifiers.
//!
//! GitLab hands out two kinds of integers that are easy to confuse: the global
//! project id and the project-scoped merge request IID. Wrapping them keeps a
//! project id from being passed where an IID is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A GitLab project id (global, not namespaced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProjectId {
    fn from(n: u64) -> Self {
        ProjectId(n)
    }
}

/// A merge request IID: the sequence number of a merge request within its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MrIid(pub u64);

impl MrIid {
    /// Name of the disposable local branch the MR head is fetched into.
    pub fn local_branch(&self) -> String {
        format!("mr-{}", self.0)
    }

    /// GitLab's server-side ref for the MR head. It survives source branch
    /// deletion and works for MRs opened from forks.
    pub fn head_ref(&self) -> String {
        format!("refs/merge-requests/{}/head", self.0)
    }
}

impl fmt::Display for MrIid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for MrIid {
    fn from(n: u64) -> Self {
        MrIid(n)
    }
}

/// An actionable webhook: combine the labeled MRs of `project` and report on `request`.
///
/// Only the classifier constructs these, and only when every field is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombineTrigger {
    pub project: ProjectId,
    pub request: MrIid,
}

impl CombineTrigger {
    pub fn new(project: impl Into<ProjectId>, request: impl Into<MrIid>) -> Self {
        CombineTrigger {
            project: project.into(),
            request: request.into(),
        }
    }
}

impl fmt::Display for CombineTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project {} MR {}", self.project, self.request)
    }
}

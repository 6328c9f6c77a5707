//! Per-project admission control.
//!
//! At most one combination runs per project. A run is admitted by taking a
//! [`ProjectLease`], which gives the project back when dropped. The lease
//! moves into the run's task, so the project is released however the task
//! ends: normal completion, an early return, or a panic (tokio drops the
//! future of a panicked task).

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::types::ProjectId;

#[derive(Debug, Error)]
pub enum GuardError {
    /// A thread panicked while holding the set. Admission is refused
    /// rather than guessing at the set's contents.
    #[error("active project set is poisoned")]
    Poisoned,
}

/// The set of projects with a combination in progress.
///
/// Cheap to clone; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ActiveProjects {
    inner: Arc<Mutex<HashSet<ProjectId>>>,
}

impl ActiveProjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `project` active if it is not already.
    ///
    /// Check and insert happen under one lock, so of any number of concurrent
    /// callers for the same project exactly one gets `Some`.
    pub fn try_admit(&self, project: ProjectId) -> Result<Option<ProjectLease>, GuardError> {
        let mut active = self.inner.lock().map_err(|_| GuardError::Poisoned)?;
        if !active.insert(project) {
            return Ok(None);
        }
        tracing::debug!(%project, "project admitted");
        Ok(Some(ProjectLease {
            project,
            active: self.clone(),
        }))
    }

    /// Marks `project` inactive. Idempotent.
    pub fn release(&self, project: ProjectId) {
        if self.lock_recovering().remove(&project) {
            tracing::debug!(%project, "project released");
        }
    }

    /// Whether `project` is active right now. The answer may be stale by the
    /// time the caller acts on it; admission goes through [`try_admit`](Self::try_admit).
    pub fn is_active(&self, project: ProjectId) -> bool {
        self.lock_recovering().contains(&project)
    }

    /// Panics while holding the lock, leaving it poisoned. Run on a
    /// throwaway thread.
    #[cfg(test)]
    pub(crate) fn poison_for_test(&self) {
        let _guard = self.inner.lock();
        panic!("poisoning active project set");
    }

    /// Releasing must never fail, so a poisoned lock is recovered. The set
    /// itself stays consistent: every mutation is a single insert or remove.
    fn lock_recovering(&self) -> MutexGuard<'_, HashSet<ProjectId>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to run a combination for one project.
#[derive(Debug)]
#[must_use = "dropping the lease releases the project immediately"]
pub struct ProjectLease {
    project: ProjectId,
    active: ActiveProjects,
}

impl ProjectLease {
    pub fn project(&self) -> ProjectId {
        self.project
    }
}

impl Drop for ProjectLease {
    fn drop(&mut self) {
        self.active.release(self.project);
    }
}

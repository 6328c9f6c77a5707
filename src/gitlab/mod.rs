//! GitLab REST API access.
//!
//! The combination run needs three calls: project metadata, the list of open
//! MRs carrying the trigger label, and posting a note. [`GitLabApi`] is the
//! seam the engine is written against; [`GitLabClient`] is the reqwest-backed
//! implementation.

pub mod client;
pub mod error;

use std::future::Future;

pub use client::GitLabClient;
pub use error::GitLabApiError;

use crate::types::{MergeRequest, MrIid, ProjectId, RepoInfo};

/// The GitLab calls a combination run makes.
pub trait GitLabApi: Send + Sync + 'static {
    /// `GET /projects/:id`
    fn project(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<RepoInfo, GitLabApiError>> + Send;

    /// All open MRs with `label`, across every page, in GitLab's order.
    fn labeled_merge_requests(
        &self,
        project: ProjectId,
        label: &str,
    ) -> impl Future<Output = Result<Vec<MergeRequest>, GitLabApiError>> + Send;

    /// Posts `body` as a note on the MR.
    fn create_note(
        &self,
        project: ProjectId,
        request: MrIid,
        body: &str,
    ) -> impl Future<Output = Result<(), GitLabApiError>> + Send;
}

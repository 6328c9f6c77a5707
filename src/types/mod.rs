//! Core domain types for the combiner.

pub mod gitlab;
pub mod ids;

pub use gitlab::{MergeRequest, RepoInfo};
pub use ids::{CombineTrigger, MrIid, ProjectId};

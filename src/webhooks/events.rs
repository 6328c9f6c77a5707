//! GitLab webhook event types.
//!
//! Only the two event kinds that can trigger a combination are modelled:
//!
//! - `note` - a comment; triggers when it is the trigger phrase on an MR
//! - `merge_request` - an MR update; triggers when the MR carries the trigger label

use serde::{Deserialize, Serialize};

use crate::types::{MrIid, ProjectId};

/// A parsed GitLab webhook event.
///
/// Other event kinds are represented by the parser returning `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    /// A comment was posted (or edited, or deleted) somewhere in a project.
    Comment(CommentEvent),

    /// An MR was opened or updated, with its current labels.
    RequestLabeled(LabelEvent),
}

/// A `note` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub action: String,

    /// The comment text, exactly as posted.
    pub body: String,

    /// What the comment is attached to (`MergeRequest`, `Issue`, `Commit`, ...).
    pub noteable_type: String,

    pub project: ProjectId,

    /// The MR the comment was posted on. `None` when the payload carries no
    /// usable `merge_request` object.
    pub request: Option<MrIid>,
}

/// A `merge_request` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    pub request: MrIid,

    /// Labels currently on the MR, in payload order.
    pub labels: Vec<Label>,

    /// The event's own project, used when a label carries no project id
    /// (group labels).
    pub project: Option<ProjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub title: String,
    pub project: Option<ProjectId>,
}

//! Deciding whether an event should start a combination.

use crate::types::CombineTrigger;

use super::events::{CommentEvent, LabelEvent, WebhookEvent};

/// The only note action that counts as posting a comment.
const CREATED_ACTION: &str = "created";

/// Noteable type of comments posted on merge requests.
const MERGE_REQUEST_NOTEABLE: &str = "MergeRequest";

/// Configured trigger phrase and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRules {
    message: String,
    tag: String,
}

impl TriggerRules {
    pub fn new(message: &str, tag: &str) -> Self {
        TriggerRules {
            message: message.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Returns the trigger for `event`, or `None` when the event is not actionable.
    pub fn classify(&self, event: &WebhookEvent) -> Option<CombineTrigger> {
        match event {
            WebhookEvent::Comment(comment) => self.classify_comment(comment),
            WebhookEvent::RequestLabeled(labeled) => self.classify_labels(labeled),
        }
    }

    /// The comment must be newly created, be exactly the trigger phrase, and
    /// sit on an MR.
    fn classify_comment(&self, comment: &CommentEvent) -> Option<CombineTrigger> {
        if comment.action != CREATED_ACTION
            || comment.body != self.message
            || comment.noteable_type != MERGE_REQUEST_NOTEABLE
        {
            return None;
        }
        comment
            .request
            .map(|request| CombineTrigger::new(comment.project, request))
    }

    fn classify_labels(&self, labeled: &LabelEvent) -> Option<CombineTrigger> {
        let label = labeled.labels.iter().find(|l| l.title == self.tag)?;
        let project = label.project.or(labeled.project)?;
        Some(CombineTrigger::new(project, labeled.request))
    }
}

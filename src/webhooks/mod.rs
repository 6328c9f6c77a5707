//! Webhook handling for GitLab events.
//!
//! This module provides:
//! - Payload parsing into [`WebhookEvent`]
//! - Classification of events into a [`CombineTrigger`](crate::types::CombineTrigger)
//! - `X-Gitlab-Token` verification
//! - Validation of the target branch requested in the webhook URL

pub mod classify;
pub mod events;
pub mod parser;
pub mod refname;
pub mod token;

pub use classify::TriggerRules;
pub use events::{CommentEvent, Label, LabelEvent, WebhookEvent};
pub use parser::{ParseError, parse_webhook};
pub use refname::is_valid_branch_name;
pub use token::verify_token;

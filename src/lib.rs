//! mr-combiner - a GitLab webhook bot that combines labeled merge requests.
//!
//! When a trigger comment is posted on an MR, or an MR gets the trigger label,
//! the bot rebuilds a target branch from the project's default branch plus
//! every open MR carrying the label, force-pushes it, and reports the result
//! as a comment on the triggering MR.

pub mod combine;
pub mod config;
pub mod git;
pub mod gitlab;
pub mod guard;
pub mod report;
pub mod server;
pub mod types;
pub mod webhooks;

//! Posting the run report back to the triggering MR.

use crate::gitlab::GitLabApi;
use crate::types::CombineTrigger;

/// First line of the note.
pub fn status_line(target_branch: &str, failed: bool) -> String {
    if failed {
        format!("An error occurred during rebase into {target_branch}")
    } else {
        format!("Merge Requests were merged into {target_branch}")
    }
}

/// The note body: status line, then the report in a fenced block.
pub fn compose_note(status: &str, report: &str) -> String {
    format!("{status}\n```\n{report}\n```")
}

/// Posts the report as a single note on the triggering MR.
///
/// Never retried: a failed post is logged and the report is lost. Returns
/// whether a note was posted.
pub async fn post_report<A: GitLabApi>(
    api: &A,
    trigger: CombineTrigger,
    status: &str,
    report: Option<String>,
) -> bool {
    let Some(report) = report else {
        tracing::warn!(
            project = %trigger.project,
            request = %trigger.request,
            "nothing to report"
        );
        return false;
    };

    let note = compose_note(status, &report);
    match api.create_note(trigger.project, trigger.request, &note).await {
        Ok(()) => {
            tracing::info!(
                project = %trigger.project,
                request = %trigger.request,
                "report posted"
            );
            true
        }
        Err(e) => {
            tracing::error!(
                project = %trigger.project,
                request = %trigger.request,
                status = ?e.status(),
                error = %e,
                "failed to post report"
            );
            false
        }
    }
}

//! GitLab webhook payload parser.
//!
//! # Parsing Strategy
//!
//! 1. The body must be a JSON object, otherwise it is a [`ParseError`]
//! 2. The event kind is read from `event_type`, falling back to `object_kind`
//! 3. Unknown kinds return `Ok(None)` (ignored, not error)
//! 4. Known kinds whose sub-structures are missing or malformed also return
//!    `Ok(None)`: GitLab sends many payload shapes and a shape we cannot read
//!    is one we do not act on

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{MrIid, ProjectId};

use super::events::{CommentEvent, Label, LabelEvent, WebhookEvent};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body is not JSON, or is JSON but not an object.
    #[error("payload is not a JSON object: {0}")]
    NotAnObject(#[from] serde_json::Error),
}

/// Parses a webhook payload into a typed event.
///
/// # Returns
///
/// * `Ok(Some(event))` - A `note` or `merge_request` event
/// * `Ok(None)` - Any other event, or a known event with an unreadable shape
/// * `Err(e)` - The body is not a JSON object
pub fn parse_webhook(payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    let root: Map<String, Value> = serde_json::from_slice(payload)?;

    let kind = ["event_type", "object_kind"]
        .iter()
        .filter_map(|key| root.get(*key).and_then(Value::as_str))
        .find(|kind| !kind.is_empty());

    Ok(match kind {
        Some("note") => parse_note(&root).map(WebhookEvent::Comment),
        Some("merge_request") => parse_merge_request(&root).map(WebhookEvent::RequestLabeled),
        _ => None,
    })
}

// ============================================================================
// Raw payload structures
//
// These mirror the parts of GitLab's webhook JSON we read. Everything else in
// the payload is ignored.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawNoteAttributes {
    action: String,
    note: String,
    noteable_type: String,
    project_id: u64,
}

#[derive(Debug, Deserialize)]
struct RawMergeRequestRef {
    iid: u64,
}

#[derive(Debug, Deserialize)]
struct RawMergeRequestAttributes {
    iid: u64,
    #[serde(default)]
    labels: Vec<RawLabel>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    title: String,
    project_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    id: u64,
}

fn field<T: DeserializeOwned>(root: &Map<String, Value>, key: &str) -> Option<T> {
    let value = root.get(key)?;
    T::deserialize(value).ok()
}

fn parse_note(root: &Map<String, Value>) -> Option<CommentEvent> {
    let attrs: RawNoteAttributes = field(root, "object_attributes")?;
    let request = field::<RawMergeRequestRef>(root, "merge_request").map(|mr| MrIid(mr.iid));

    Some(CommentEvent {
        action: attrs.action,
        body: attrs.note,
        noteable_type: attrs.noteable_type,
        project: ProjectId(attrs.project_id),
        request,
    })
}

fn parse_merge_request(root: &Map<String, Value>) -> Option<LabelEvent> {
    let attrs: RawMergeRequestAttributes = field(root, "object_attributes")?;
    let project = field::<RawProject>(root, "project").map(|p| ProjectId(p.id));

    Some(LabelEvent {
        request: MrIid(attrs.iid),
        labels: attrs
            .labels
            .into_iter()
            .map(|l| Label {
                title: l.title,
                project: l.project_id.map(ProjectId),
            })
            .collect(),
        project,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE_PAYLOAD: &str = r#"{
        "object_kind": "note",
        "event_type": "note",
        "project_id": 5,
        "project": { "id": 5, "name": "app" },
        "object_attributes": {
            "id": 1244,
            "action": "created",
            "note": "combine mr",
            "noteable_type": "MergeRequest",
            "noteable_id": 9,
            "project_id": 5
        },
        "merge_request": { "id": 9, "iid": 34, "title": "Add login" }
    }"#;

    const MR_PAYLOAD: &str = r#"{
        "object_kind": "merge_request",
        "event_type": "merge_request",
        "project": { "id": 12 },
        "object_attributes": {
            "iid": 7,
            "action": "update",
            "labels": [
                { "id": 1, "title": "backend", "project_id": 12 },
                { "id": 2, "title": "mr-combine", "project_id": 12 }
            ]
        }
    }"#;

    #[test]
    fn parses_note_event() {
        let event = parse_webhook(NOTE_PAYLOAD.as_bytes()).unwrap().unwrap();
        assert_eq!(
            event,
            WebhookEvent::Comment(CommentEvent {
                action: "created".to_string(),
                body: "combine mr".to_string(),
                noteable_type: "MergeRequest".to_string(),
                project: ProjectId(5),
                request: Some(MrIid(34)),
            })
        );
    }

    #[test]
    fn note_without_merge_request_has_no_request() {
        let payload = r#"{
            "event_type": "note",
            "object_attributes": {
                "action": "created", "note": "hi",
                "noteable_type": "Issue", "project_id": 5
            }
        }"#;
        let Some(WebhookEvent::Comment(comment)) = parse_webhook(payload.as_bytes()).unwrap() else {
            panic!("expected a comment event");
        };
        assert_eq!(comment.request, None);
    }

    #[test]
    fn parses_merge_request_event() {
        let event = parse_webhook(MR_PAYLOAD.as_bytes()).unwrap().unwrap();
        let WebhookEvent::RequestLabeled(mr) = event else {
            panic!("expected a merge_request event");
        };
        assert_eq!(mr.request, MrIid(7));
        assert_eq!(mr.project, Some(ProjectId(12)));
        let titles: Vec<_> = mr.labels.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["backend", "mr-combine"]);
        assert_eq!(mr.labels[1].project, Some(ProjectId(12)));
    }

    #[test]
    fn object_kind_is_used_when_event_type_is_absent() {
        let payload = MR_PAYLOAD.replace(r#""event_type": "merge_request","#, "");
        assert!(matches!(
            parse_webhook(payload.as_bytes()).unwrap(),
            Some(WebhookEvent::RequestLabeled(_))
        ));
    }

    #[test]
    fn group_label_without_project_id() {
        let payload = r#"{
            "object_kind": "merge_request",
            "object_attributes": {
                "iid": 2,
                "labels": [{ "title": "mr-combine", "project_id": null, "group_id": 4 }]
            }
        }"#;
        let Some(WebhookEvent::RequestLabeled(mr)) = parse_webhook(payload.as_bytes()).unwrap() else {
            panic!("expected a merge_request event");
        };
        assert_eq!(mr.labels[0].project, None);
        assert_eq!(mr.project, None);
    }

    #[test]
    fn unknown_kind_is_ignored() {
        let payload = r#"{"object_kind": "pipeline", "object_attributes": {"id": 1}}"#;
        assert!(parse_webhook(payload.as_bytes()).unwrap().is_none());
        assert!(parse_webhook(b"{}").unwrap().is_none());
    }

    #[test]
    fn malformed_sub_structure_is_ignored() {
        let cases = [
            r#"{"event_type": "note"}"#,
            r#"{"event_type": "note", "object_attributes": "oops"}"#,
            r#"{"event_type": "note", "object_attributes": {"action": "created"}}"#,
            r#"{"event_type": "merge_request", "object_attributes": {"iid": "seven"}}"#,
            r#"{"event_type": "merge_request", "object_attributes": {"iid": 1, "labels": {}}}"#,
            r#"{"event_type": 42, "object_kind": "note"}"#,
        ];
        for case in cases {
            let parsed = parse_webhook(case.as_bytes());
            assert!(
                matches!(parsed, Ok(None) | Ok(Some(_))),
                "{case} should not be a parse error"
            );
        }
        // The first five are known kinds with unreadable shapes.
        for case in &cases[..5] {
            assert!(parse_webhook(case.as_bytes()).unwrap().is_none(), "{case}");
        }
    }

    #[test]
    fn non_object_bodies_are_parse_errors() {
        for body in ["", "not json", "[]", "42", "\"note\"", "null"] {
            assert!(parse_webhook(body.as_bytes()).is_err(), "{body:?}");
        }
    }
}

//! JSON output formatting.

use pinvault_core::storage::{EntryView, VaultEntry};
use pinvault_core::{ChallengeOutcome, EntryState};

fn state_json(entry: &VaultEntry) -> serde_json::Value {
    match EntryState::of(entry) {
        EntryState::Public => serde_json::json!({ "state": "public" }),
        EntryState::GraceHidden { deadline } => {
            serde_json::json!({ "state": "grace_hidden", "grace_deadline": deadline })
        }
    }
}

/// Convert an owned entry to JSON. The passcode is included only on request.
pub fn entry_json(entry: &VaultEntry, reveal: bool) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": entry.id,
        "keyword": entry.keyword,
        "owner": entry.owner.to_string(),
        "passcode_length": entry.passcode_length,
        "passcode_set": entry.passcode.is_some(),
        "body": entry.body,
        "media_urls": entry.media_urls,
        "view_count": entry.view_count,
        "stolen_count": entry.stolen_count,
        "failed_count": entry.failed_count,
        "notify_threshold": entry.notify_threshold,
        "created_at": entry.created_at,
        "updated_at": entry.updated_at,
        "visibility": state_json(entry),
    });
    if reveal {
        if let Some(passcode) = entry.passcode.as_ref() {
            value["passcode"] = serde_json::Value::String(passcode.expose().to_string());
        }
    }
    value
}

pub fn view_json(view: &EntryView) -> serde_json::Value {
    serde_json::to_value(view).unwrap_or(serde_json::Value::Null)
}

/// Challenge outcome: the wire string plus the retry time when limited.
pub fn outcome_json(outcome: &ChallengeOutcome) -> serde_json::Value {
    match outcome {
        ChallengeOutcome::LimitExceeded { retry_at } => serde_json::json!({
            "outcome": outcome.to_wire(),
            "retry_at": retry_at,
        }),
        _ => serde_json::json!({ "outcome": outcome.to_wire() }),
    }
}

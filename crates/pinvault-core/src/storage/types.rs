//! Core data types for the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Identity;
use crate::passcode::{Passcode, MIN_PASSCODE_LENGTH};

/// A keyword-addressed, passcode-guarded note.
#[derive(Debug, Clone)]
pub struct VaultEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// Globally unique, case-sensitive lookup keyword
    pub keyword: String,

    /// Current passcode length (never decreases)
    pub passcode_length: u8,

    /// Current passcode; `None` after a length upgrade until the owner sets one
    pub passcode: Option<Passcode>,

    /// Current owner
    pub owner: Identity,

    /// Set while the entry is hidden after a theft
    pub grace_deadline: Option<DateTime<Utc>>,

    /// Note text (opaque to the core)
    pub body: String,

    /// Media URLs returned by the upload collaborator
    pub media_urls: Vec<String>,

    pub view_count: u64,
    pub stolen_count: u64,
    pub failed_count: u64,

    /// Notify the owner every time this many failed attempts accumulate
    pub notify_threshold: Option<u32>,

    /// When this entry was created
    pub created_at: DateTime<Utc>,

    /// Last committed mutation
    pub updated_at: DateTime<Utc>,
}

impl VaultEntry {
    pub fn is_hidden(&self) -> bool {
        self.grace_deadline.is_some()
    }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        &self.owner == identity
    }

    /// Projection safe to show to anyone who knows the keyword.
    pub fn public_view(&self) -> EntryView {
        EntryView {
            id: self.id,
            keyword: self.keyword.clone(),
            passcode_length: self.passcode_length,
            body: self.body.clone(),
            media_urls: self.media_urls.clone(),
            view_count: self.view_count,
            stolen_count: self.stolen_count,
            failed_count: self.failed_count,
            created_at: self.created_at,
        }
    }
}

/// What a non-owner sees of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub id: Uuid,
    pub keyword: String,
    pub passcode_length: u8,
    pub body: String,
    pub media_urls: Vec<String>,
    pub view_count: u64,
    pub stolen_count: u64,
    pub failed_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Builder for creating new entries.
#[derive(Debug, Clone)]
pub struct NewVaultEntry {
    /// Lookup keyword
    pub keyword: String,

    /// Note text
    pub body: String,

    /// Media URLs
    pub media_urls: Vec<String>,

    /// Author, who becomes the first owner
    pub owner: Identity,

    /// Initial passcode (free-tier length)
    pub passcode: String,
}

impl NewVaultEntry {
    pub fn new(
        keyword: impl Into<String>,
        body: impl Into<String>,
        owner: Identity,
        passcode: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            body: body.into(),
            media_urls: Vec::new(),
            owner,
            passcode: passcode.into(),
        }
    }

    pub fn with_media(mut self, media_urls: Vec<String>) -> Self {
        self.media_urls = media_urls;
        self
    }

    /// Length every new entry starts with.
    pub fn initial_length() -> u8 {
        MIN_PASSCODE_LENGTH
    }
}

/// Owner edits to the opaque payload.
#[derive(Debug, Clone, Default)]
pub struct EntryEdit {
    pub body: Option<String>,
    pub media_urls: Option<Vec<String>>,
}

impl EntryEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn media(mut self, media_urls: Vec<String>) -> Self {
        self.media_urls = Some(media_urls);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.media_urls.is_none()
    }
}

/// Outcome stamped on an attempt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Admitted, not yet evaluated (only visible inside the admitting transaction)
    Pending,
    Success,
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Pending => "pending",
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AttemptOutcome::Pending),
            "success" => Some(AttemptOutcome::Success),
            "failure" => Some(AttemptOutcome::Failure),
            _ => None,
        }
    }
}

/// One admitted challenge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub entry_id: Uuid,
    pub challenger: Identity,
    /// Rate-limit period label (see `AttemptWindow::period_label`)
    pub period: String,
    pub outcome: AttemptOutcome,
    pub attempted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_builder() {
        let owner = Identity::device("d-1");
        let entry = NewVaultEntry::new("sunset", "hello", owner.clone(), "123")
            .with_media(vec!["https://cdn.example/a.png".to_string()]);

        assert_eq!(entry.keyword, "sunset");
        assert_eq!(entry.owner, owner);
        assert_eq!(entry.media_urls.len(), 1);
        assert_eq!(NewVaultEntry::initial_length(), 3);
    }

    #[test]
    fn test_entry_edit_builder() {
        assert!(EntryEdit::new().is_empty());
        let edit = EntryEdit::new().body("new body");
        assert_eq!(edit.body.as_deref(), Some("new body"));
        assert!(edit.media_urls.is_none());
    }

    #[test]
    fn test_attempt_outcome_round_trip() {
        for outcome in [
            AttemptOutcome::Pending,
            AttemptOutcome::Success,
            AttemptOutcome::Failure,
        ] {
            assert_eq!(AttemptOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(AttemptOutcome::parse("maybe"), None);
    }
}

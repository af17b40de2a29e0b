//! Ownership and grace-period state machine.
//!
//! ```text
//!            correct guess                 owner sets passcode
//!   Public ────────────────▶ GraceHidden ─────────────────────▶ Public
//!     ▲                          │
//!     └──────────────────────────┘
//!        deadline passes (auto-publish with the all-zero passcode)
//! ```
//!
//! Transitions here mutate an in-memory [`VaultEntry`]; the vault persists the
//! result in the same store transaction that loaded it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, VaultError};
use crate::feedback::Feedback;
use crate::identity::Identity;
use crate::passcode::Passcode;
use crate::storage::VaultEntry;

/// Visibility state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Visible and guessable
    Public,
    /// Recently stolen; hidden until the new owner acts or the deadline passes
    GraceHidden { deadline: DateTime<Utc> },
}

impl EntryState {
    pub fn of(entry: &VaultEntry) -> Self {
        match entry.grace_deadline {
            Some(deadline) => EntryState::GraceHidden { deadline },
            None => EntryState::Public,
        }
    }
}

/// Result of a challenge that reached the attempt ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Guess was correct; the challenger now owns the entry.
    Success,
    /// Guess was wrong; per-position hints in guess order.
    Failed(Feedback),
    /// The challenger already used this period's attempt.
    LimitExceeded { retry_at: DateTime<Utc> },
}

impl ChallengeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ChallengeOutcome::Success)
    }

    /// Boundary encoding: `success`, `limit_exceeded` or `failed:<hints>`.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChallengeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeOutcome::Success => write!(f, "success"),
            ChallengeOutcome::LimitExceeded { .. } => write!(f, "limit_exceeded"),
            ChallengeOutcome::Failed(feedback) => write!(f, "failed:{}", feedback),
        }
    }
}

/// Decoded boundary string. The retry time is not part of the wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireOutcome {
    Success,
    LimitExceeded,
    Failed(Feedback),
}

impl FromStr for WireOutcome {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(WireOutcome::Success),
            "limit_exceeded" => Ok(WireOutcome::LimitExceeded),
            other => {
                let hints = other.strip_prefix("failed:").ok_or_else(|| {
                    VaultError::InvalidInput(format!("Unknown challenge outcome: {}", other))
                })?;
                Ok(WireOutcome::Failed(hints.parse()?))
            }
        }
    }
}

/// What `resolve_grace` did to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceResolution {
    /// The owner supplied a passcode; the entry is public again.
    Published,
    /// The deadline passed; the entry went public with the all-zero passcode.
    AutoPublished,
    /// Still hidden; nothing to do before the deadline.
    Pending { deadline: DateTime<Utc> },
    /// The entry was not hidden; a supplied passcode was still applied.
    AlreadyPublic,
}

/// Auto-publish an entry whose grace deadline has passed.
///
/// Returns `true` if the entry changed.
pub fn expire_if_due(entry: &mut VaultEntry, now: DateTime<Utc>) -> bool {
    match entry.grace_deadline {
        Some(deadline) if now >= deadline => {
            entry.grace_deadline = None;
            entry.updated_at = now;
            tracing::debug!(entry_id = %entry.id, %deadline, "grace period expired");
            true
        }
        _ => false,
    }
}

/// Hand the entry to `challenger` after a correct guess.
///
/// Resets the passcode to zeros of the current length, hides the entry until
/// `now + grace_period` and counts the theft. Returns the previous owner.
pub fn transfer_ownership(
    entry: &mut VaultEntry,
    challenger: &Identity,
    grace_period: Duration,
    now: DateTime<Utc>,
) -> Result<Identity> {
    let passcode = Passcode::zeroed(entry.passcode_length)?;
    let previous = std::mem::replace(&mut entry.owner, challenger.clone());
    entry.passcode = Some(passcode);
    entry.grace_deadline = Some(now + grace_period);
    entry.stolen_count += 1;
    entry.updated_at = now;
    Ok(previous)
}

/// Count a failed evaluated guess.
pub fn record_failure(entry: &mut VaultEntry, now: DateTime<Utc>) {
    entry.failed_count += 1;
    entry.updated_at = now;
}

/// Leave the grace state, either with an owner-supplied passcode or, once
/// the deadline has passed, with the all-zero default.
///
/// Callers must already have applied [`expire_if_due`] and checked ownership
/// when a passcode is supplied.
pub fn resolve(
    entry: &mut VaultEntry,
    new_passcode: Option<Passcode>,
    expired: bool,
    now: DateTime<Utc>,
) -> Result<GraceResolution> {
    if let Some(passcode) = new_passcode {
        if passcode.len() != entry.passcode_length {
            return Err(VaultError::Validation(format!(
                "Passcode must be exactly {} digits",
                entry.passcode_length
            )));
        }
        let was_hidden = entry.is_hidden() || expired;
        entry.passcode = Some(passcode);
        entry.grace_deadline = None;
        entry.updated_at = now;
        return Ok(if was_hidden {
            GraceResolution::Published
        } else {
            GraceResolution::AlreadyPublic
        });
    }

    match EntryState::of(entry) {
        EntryState::GraceHidden { deadline } => Ok(GraceResolution::Pending { deadline }),
        EntryState::Public if expired => Ok(GraceResolution::AutoPublished),
        EntryState::Public => Ok(GraceResolution::AlreadyPublic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::feedback::evaluate;

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entry(passcode: &str) -> VaultEntry {
        let created = at("2026-01-01T00:00:00Z");
        VaultEntry {
            id: Uuid::new_v4(),
            keyword: "sunset".to_string(),
            passcode_length: passcode.len() as u8,
            passcode: Some(Passcode::parse(passcode).unwrap()),
            owner: Identity::device("author"),
            grace_deadline: None,
            body: "hello".to_string(),
            media_urls: Vec::new(),
            view_count: 0,
            stolen_count: 0,
            failed_count: 0,
            notify_threshold: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_transfer_resets_passcode_and_hides() {
        let mut entry = entry("4821");
        let thief = Identity::account("thief");
        let now = at("2026-01-02T10:00:00Z");

        let previous = transfer_ownership(&mut entry, &thief, Duration::hours(24), now).unwrap();

        assert_eq!(previous, Identity::device("author"));
        assert_eq!(entry.owner, thief);
        assert_eq!(entry.passcode.as_ref().unwrap().expose(), "0000");
        assert_eq!(entry.stolen_count, 1);
        assert_eq!(
            EntryState::of(&entry),
            EntryState::GraceHidden {
                deadline: at("2026-01-03T10:00:00Z")
            }
        );
    }

    #[test]
    fn test_expire_if_due_only_after_deadline() {
        let mut entry = entry("482");
        entry.grace_deadline = Some(at("2026-01-03T10:00:00Z"));

        assert!(!expire_if_due(&mut entry, at("2026-01-03T09:59:59Z")));
        assert!(entry.is_hidden());
        assert!(expire_if_due(&mut entry, at("2026-01-03T10:00:00Z")));
        assert_eq!(EntryState::of(&entry), EntryState::Public);
        assert!(!expire_if_due(&mut entry, at("2026-01-04T00:00:00Z")));
    }

    #[test]
    fn test_resolve_with_passcode_publishes() {
        let mut entry = entry("482");
        entry.grace_deadline = Some(at("2026-01-03T10:00:00Z"));
        let now = at("2026-01-02T12:00:00Z");

        let resolution = resolve(&mut entry, Some(Passcode::parse("913").unwrap()), false, now)
            .unwrap();

        assert_eq!(resolution, GraceResolution::Published);
        assert!(!entry.is_hidden());
        assert_eq!(entry.passcode.as_ref().unwrap().expose(), "913");
    }

    #[test]
    fn test_resolve_rejects_wrong_length() {
        let mut entry = entry("482");
        entry.grace_deadline = Some(at("2026-01-03T10:00:00Z"));
        let result = resolve(
            &mut entry,
            Some(Passcode::parse("9130").unwrap()),
            false,
            at("2026-01-02T12:00:00Z"),
        );
        assert!(result.is_err());
        assert!(entry.is_hidden());
    }

    #[test]
    fn test_resolve_without_passcode() {
        let mut entry = entry("000");
        entry.grace_deadline = Some(at("2026-01-03T10:00:00Z"));
        assert_eq!(
            resolve(&mut entry, None, false, at("2026-01-02T12:00:00Z")).unwrap(),
            GraceResolution::Pending {
                deadline: at("2026-01-03T10:00:00Z")
            }
        );

        let now = at("2026-01-03T11:00:00Z");
        let expired = expire_if_due(&mut entry, now);
        assert_eq!(
            resolve(&mut entry, None, expired, now).unwrap(),
            GraceResolution::AutoPublished
        );
        assert_eq!(entry.passcode.as_ref().unwrap().expose(), "000");
    }

    #[test]
    fn test_wire_encoding() {
        let failed = ChallengeOutcome::Failed(evaluate("482", "428").unwrap());
        assert_eq!(failed.to_wire(), "failed:◎○○");
        assert_eq!(ChallengeOutcome::Success.to_wire(), "success");
        let limited = ChallengeOutcome::LimitExceeded {
            retry_at: at("2026-01-02T00:00:00Z"),
        };
        assert_eq!(limited.to_wire(), "limit_exceeded");

        let decoded: WireOutcome = "failed:◎○○".parse().unwrap();
        assert_eq!(
            decoded,
            WireOutcome::Failed(evaluate("482", "428").unwrap())
        );
        assert_eq!("success".parse::<WireOutcome>().unwrap(), WireOutcome::Success);
        assert!("failed:".parse::<WireOutcome>().is_err());
        assert!("stolen".parse::<WireOutcome>().is_err());
    }
}

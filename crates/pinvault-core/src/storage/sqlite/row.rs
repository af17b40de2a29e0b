//! Entry row type for database queries.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::identity::Identity;
use crate::passcode::Passcode;
use crate::storage::types::VaultEntry;

/// Columns selected for every entry query, in `EntryRow` field order.
pub const ENTRY_COLUMNS: &str = "id, keyword, passcode_length, passcode, owner, \
     is_hidden, grace_deadline, body, media_json, view_count, stolen_count, \
     failed_count, notify_threshold, created_at, updated_at";

/// Raw row data from the entries table, before parsing into domain types.
#[derive(Debug)]
pub struct EntryRow {
    pub id: String,
    pub keyword: String,
    pub passcode_length: i64,
    pub passcode: Option<String>,
    pub owner: String,
    pub is_hidden: bool,
    pub grace_deadline: Option<String>,
    pub body: String,
    pub media_json: Option<String>,
    pub view_count: i64,
    pub stolen_count: i64,
    pub failed_count: i64,
    pub notify_threshold: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl EntryRow {
    /// Read a row selected with [`ENTRY_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            keyword: row.get(1)?,
            passcode_length: row.get(2)?,
            passcode: row.get(3)?,
            owner: row.get(4)?,
            is_hidden: row.get(5)?,
            grace_deadline: row.get(6)?,
            body: row.get(7)?,
            media_json: row.get(8)?,
            view_count: row.get(9)?,
            stolen_count: row.get(10)?,
            failed_count: row.get(11)?,
            notify_threshold: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

/// Format a timestamp so that string order matches time order.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| VaultError::Storage(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc))
}

fn parse_count(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| VaultError::Storage(format!("Negative {} in entry row", column)))
}

impl TryFrom<EntryRow> for VaultEntry {
    type Error = VaultError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| VaultError::Storage(format!("Invalid entry UUID: {}", e)))?;
        let passcode_length = u8::try_from(row.passcode_length)
            .map_err(|_| VaultError::Storage("Invalid passcode length".to_string()))?;
        let passcode = row
            .passcode
            .as_deref()
            .map(|digits| {
                Passcode::parse_with_length(digits, passcode_length).map_err(|_| {
                    VaultError::Storage(format!("Stored passcode of entry {} is corrupt", id))
                })
            })
            .transpose()?;
        let owner = row
            .owner
            .parse::<Identity>()
            .map_err(|e| VaultError::Storage(format!("Invalid owner: {}", e)))?;
        let grace_deadline = row
            .grace_deadline
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        if row.is_hidden != grace_deadline.is_some() {
            return Err(VaultError::Storage(format!(
                "Entry {} hidden flag disagrees with grace deadline",
                id
            )));
        }
        let media_urls: Vec<String> = match row.media_json {
            Some(ref value) => serde_json::from_str(value)
                .map_err(|e| VaultError::Storage(format!("Invalid media JSON: {}", e)))?,
            None => Vec::new(),
        };
        let notify_threshold = row
            .notify_threshold
            .map(|value| {
                u32::try_from(value)
                    .map_err(|_| VaultError::Storage("Invalid notify threshold".to_string()))
            })
            .transpose()?;

        Ok(VaultEntry {
            id,
            keyword: row.keyword,
            passcode_length,
            passcode,
            owner,
            grace_deadline,
            body: row.body,
            media_urls,
            view_count: parse_count(row.view_count, "view_count")?,
            stolen_count: parse_count(row.stolen_count, "stolen_count")?,
            failed_count: parse_count(row.failed_count, "failed_count")?,
            notify_threshold,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> EntryRow {
        EntryRow {
            id: Uuid::new_v4().to_string(),
            keyword: "sunset".to_string(),
            passcode_length: 3,
            passcode: Some("482".to_string()),
            owner: "device:abc".to_string(),
            is_hidden: false,
            grace_deadline: None,
            body: "hello".to_string(),
            media_json: Some(r#"["https://cdn.example/a.png"]"#.to_string()),
            view_count: 2,
            stolen_count: 0,
            failed_count: 1,
            notify_threshold: Some(3),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_row_converts() {
        let entry: VaultEntry = row().try_into().unwrap();
        assert_eq!(entry.keyword, "sunset");
        assert_eq!(entry.passcode.as_ref().unwrap().expose(), "482");
        assert_eq!(entry.media_urls.len(), 1);
        assert_eq!(entry.notify_threshold, Some(3));
    }

    #[test]
    fn test_row_rejects_length_mismatch() {
        let mut bad = row();
        bad.passcode = Some("4821".to_string());
        assert!(VaultEntry::try_from(bad).is_err());
    }

    #[test]
    fn test_row_rejects_hidden_without_deadline() {
        let mut bad = row();
        bad.is_hidden = true;
        assert!(VaultEntry::try_from(bad).is_err());
    }

    #[test]
    fn test_timestamp_format_sorts() {
        let earlier = parse_timestamp("2026-01-01T00:00:00.5Z").unwrap();
        let later = parse_timestamp("2026-01-01T00:00:01Z").unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }
}

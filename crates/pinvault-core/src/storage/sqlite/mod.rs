//! SQLite storage backend.
//!
//! A single connection guarded by a mutex serves every transaction in the
//! process, and each transaction starts with `BEGIN IMMEDIATE` so writers in
//! other processes sharing the file are serialized by SQLite's own lock.

mod row;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::identity::Identity;
use crate::notify::{OutboxEvent, VaultEvent};
use crate::storage::traits::{StoreTransaction, VaultStore};
use crate::storage::types::{AttemptOutcome, AttemptRecord, VaultEntry};
use crate::tier::EntitlementSource;

use row::{format_timestamp, parse_timestamp, EntryRow, ENTRY_COLUMNS};

/// On-disk schema version.
pub const FORMAT_VERSION: &str = "1";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE entries (
        id TEXT PRIMARY KEY,
        keyword TEXT NOT NULL UNIQUE,
        passcode_length INTEGER NOT NULL CHECK (passcode_length BETWEEN 3 AND 10),
        passcode TEXT CHECK (passcode IS NULL OR length(passcode) = passcode_length),
        owner TEXT NOT NULL,
        is_hidden INTEGER NOT NULL DEFAULT 0,
        grace_deadline TEXT,
        body TEXT NOT NULL,
        media_json TEXT,
        view_count INTEGER NOT NULL DEFAULT 0,
        stolen_count INTEGER NOT NULL DEFAULT 0,
        failed_count INTEGER NOT NULL DEFAULT 0,
        notify_threshold INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,

        CHECK ((is_hidden = 1) = (grace_deadline IS NOT NULL))
    );

    CREATE INDEX entries_owner ON entries (owner);
    CREATE INDEX entries_grace ON entries (grace_deadline) WHERE grace_deadline IS NOT NULL;

    -- One row per admitted attempt; the key is the rate-limit gate
    CREATE TABLE attempts (
        entry_id TEXT NOT NULL,
        challenger TEXT NOT NULL,
        period TEXT NOT NULL,
        outcome TEXT NOT NULL,
        attempted_at TEXT NOT NULL,

        PRIMARY KEY (entry_id, challenger, period),
        FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
    );

    CREATE INDEX attempts_latest ON attempts (entry_id, challenger, attempted_at);

    -- Purchases reported by the store front; reference makes replays harmless
    CREATE TABLE entitlement_grants (
        id TEXT PRIMARY KEY,
        owner TEXT NOT NULL,
        passcode_length INTEGER NOT NULL,
        reference TEXT NOT NULL UNIQUE,
        granted_at TEXT NOT NULL
    );

    -- Applied purchases; kept when the upgraded entry is deleted
    CREATE TABLE entitlement_uses (
        owner TEXT NOT NULL,
        passcode_length INTEGER NOT NULL,
        entry_id TEXT NOT NULL,
        applied_at TEXT NOT NULL
    );

    CREATE INDEX entitlement_uses_owner ON entitlement_uses (owner, passcode_length);

    CREATE TABLE outbox (
        id TEXT PRIMARY KEY,
        entry_id TEXT NOT NULL,
        payload_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        delivered_at TEXT
    );

    CREATE INDEX outbox_pending ON outbox (created_at) WHERE delivered_at IS NULL;
"#;

/// SQLite-backed vault store.
pub struct SqliteVaultStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteVaultStore {
    /// Create a new store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the file already exists.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(VaultError::Storage("Store file already exists".to_string()));
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn, true)?;
        Self::initialize(&conn)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing store.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotFound` if there is no store at `path`, and
    /// `VaultError::Storage` if its format version is unknown.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VaultError::NotFound(format!(
                "Store not found at {}",
                path.display()
            )));
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn, true)?;

        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'format_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| VaultError::Storage(format!("Not a vault store: {}", e)))?;
        match version.as_deref() {
            Some(FORMAT_VERSION) => {}
            Some(other) => {
                return Err(VaultError::Storage(format!(
                    "Unsupported store format version {}",
                    other
                )))
            }
            None => return Err(VaultError::Storage("Store metadata missing".to_string())),
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// A private in-memory store, used by tests and demos.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn, false)?;
        Self::initialize(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn configure(conn: &Connection, on_disk: bool) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", true)?;
        if on_disk {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        }
        Ok(())
    }

    fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA)?;
        let created_at = format_timestamp(Utc::now());
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)",
            ["format_version", FORMAT_VERSION],
        )?;
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?, ?)",
            ["created_at", &created_at],
        )?;
        Ok(())
    }

    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VaultError::Storage("SQLite connection poisoned".to_string()))
    }

    /// Record a purchase reported by the store front.
    ///
    /// Returns `false` if `reference` was already recorded.
    pub fn record_grant(
        &self,
        owner: &Identity,
        length: u8,
        reference: &str,
        granted_at: DateTime<Utc>,
    ) -> Result<bool> {
        crate::passcode::validate_length(length)?;
        if reference.trim().is_empty() {
            return Err(VaultError::InvalidInput(
                "Purchase reference is empty".to_string(),
            ));
        }
        let conn = self.lock_conn()?;
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO entitlement_grants (id, owner, passcode_length, reference, granted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            (
                Uuid::new_v4().to_string(),
                owner.to_string(),
                length,
                reference,
                format_timestamp(granted_at),
            ),
        )?;
        Ok(inserted == 1)
    }
}

impl VaultStore for SqliteVaultStore {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        let conn = self.lock_conn()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteTransaction {
            conn,
            finished: false,
        }))
    }

    fn check_integrity(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
        let mut rows = stmt.query([])?;
        if rows.next()?.is_some() {
            return Err(VaultError::Storage(
                "Foreign key integrity check failed".to_string(),
            ));
        }

        let bad_passcodes: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM entries
            WHERE passcode IS NOT NULL
              AND (length(passcode) != passcode_length OR passcode GLOB '*[^0-9]*')
            "#,
            [],
            |row| row.get(0),
        )?;
        if bad_passcodes > 0 {
            return Err(VaultError::Storage(format!(
                "{} entries have a malformed passcode",
                bad_passcodes
            )));
        }

        let bad_grace: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE (is_hidden = 1) != (grace_deadline IS NOT NULL)",
            [],
            |row| row.get(0),
        )?;
        if bad_grace > 0 {
            return Err(VaultError::Storage(format!(
                "{} entries have an inconsistent grace state",
                bad_grace
            )));
        }

        let pending_attempts: i64 = conn.query_row(
            "SELECT COUNT(*) FROM attempts WHERE outcome = 'pending'",
            [],
            |row| row.get(0),
        )?;
        if pending_attempts > 0 {
            return Err(VaultError::Storage(format!(
                "{} attempts were committed without an outcome",
                pending_attempts
            )));
        }

        let overused: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT u.owner, u.passcode_length, COUNT(*) AS used
                FROM entitlement_uses u
                GROUP BY u.owner, u.passcode_length
            ) uses
            WHERE uses.used > (
                SELECT COUNT(*) FROM entitlement_grants g
                WHERE g.owner = uses.owner AND g.passcode_length = uses.passcode_length
            )
            "#,
            [],
            |row| row.get(0),
        )?;
        if overused > 0 {
            return Err(VaultError::Storage(format!(
                "{} entitlements applied more often than purchased",
                overused
            )));
        }

        Ok(())
    }

    fn backup_to(&self, destination: &Path) -> Result<()> {
        let staged = crate::fs::temp_sibling(destination)?;
        let staged_str = staged
            .to_str()
            .ok_or_else(|| VaultError::InvalidInput("Backup path is not UTF-8".to_string()))?;

        {
            let conn = self.lock_conn()?;
            conn.execute("VACUUM INTO ?", [staged_str])?;
        }

        crate::fs::replace_with(&staged, destination)
            .map_err(|e| VaultError::Storage(format!("Backup rename failed: {}", e)))?;
        tracing::info!(destination = %destination.display(), "store backed up");
        Ok(())
    }
}

impl EntitlementSource for SqliteVaultStore {
    fn granted(&self, owner: &Identity, length: u8) -> Result<u32> {
        let conn = self.lock_conn()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM entitlement_grants WHERE owner = ? AND passcode_length = ?",
            (owner.to_string(), length),
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Open `BEGIN IMMEDIATE` transaction holding the connection lock.
struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl SqliteTransaction<'_> {
    fn query_entries(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<VaultEntry>> {
        let query = format!("SELECT {} FROM entries {}", ENTRY_COLUMNS, filter);
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params, EntryRow::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }

    fn query_entry(&self, filter: &str, params: impl rusqlite::Params) -> Result<Option<VaultEntry>> {
        let query = format!("SELECT {} FROM entries {}", ENTRY_COLUMNS, filter);
        let row = self
            .conn
            .query_row(&query, params, EntryRow::from_row)
            .optional()?;
        row.map(VaultEntry::try_from).transpose()
    }
}

fn media_json(entry: &VaultEntry) -> Result<Option<String>> {
    if entry.media_urls.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(&entry.media_urls)
        .map(Some)
        .map_err(|e| VaultError::Storage(format!("Failed to serialize media URLs: {}", e)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn entry(&mut self, id: &Uuid) -> Result<Option<VaultEntry>> {
        self.query_entry("WHERE id = ?", [id.to_string()])
    }

    fn entry_by_keyword(&mut self, keyword: &str) -> Result<Option<VaultEntry>> {
        self.query_entry("WHERE keyword = ?", [keyword])
    }

    fn entries_owned_by(&mut self, owner: &Identity) -> Result<Vec<VaultEntry>> {
        self.query_entries(
            "WHERE owner = ? ORDER BY created_at DESC",
            [owner.to_string()],
        )
    }

    fn entries_due_for_publish(&mut self, now: DateTime<Utc>) -> Result<Vec<VaultEntry>> {
        self.query_entries(
            "WHERE grace_deadline IS NOT NULL AND grace_deadline <= ? ORDER BY grace_deadline",
            [format_timestamp(now)],
        )
    }

    fn insert_entry(&mut self, entry: &VaultEntry) -> Result<()> {
        let taken: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM entries WHERE keyword = ?",
                [&entry.keyword],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(VaultError::KeywordAlreadyExists(entry.keyword.clone()));
        }

        let result = self.conn.execute(
            r#"
            INSERT INTO entries (
                id, keyword, passcode_length, passcode, owner, is_hidden, grace_deadline,
                body, media_json, view_count, stolen_count, failed_count, notify_threshold,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                entry.id.to_string(),
                entry.keyword,
                entry.passcode_length,
                entry.passcode.as_ref().map(|p| p.expose().to_string()),
                entry.owner.to_string(),
                entry.is_hidden(),
                entry.grace_deadline.map(format_timestamp),
                entry.body,
                media_json(entry)?,
                entry.view_count as i64,
                entry.stolen_count as i64,
                entry.failed_count as i64,
                entry.notify_threshold,
                format_timestamp(entry.created_at),
                format_timestamp(entry.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(VaultError::KeywordAlreadyExists(entry.keyword.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_entry(&mut self, entry: &VaultEntry) -> Result<()> {
        // Length and counters may only grow; a stale write matches no row.
        let updated = self.conn.execute(
            r#"
            UPDATE entries SET
                passcode_length = ?1,
                passcode = ?2,
                owner = ?3,
                is_hidden = ?4,
                grace_deadline = ?5,
                body = ?6,
                media_json = ?7,
                view_count = ?8,
                stolen_count = ?9,
                failed_count = ?10,
                notify_threshold = ?11,
                updated_at = ?12
            WHERE id = ?13
              AND passcode_length <= ?1
              AND view_count <= ?8
              AND stolen_count <= ?9
              AND failed_count <= ?10
            "#,
            rusqlite::params![
                entry.passcode_length,
                entry.passcode.as_ref().map(|p| p.expose().to_string()),
                entry.owner.to_string(),
                entry.is_hidden(),
                entry.grace_deadline.map(format_timestamp),
                entry.body,
                media_json(entry)?,
                entry.view_count as i64,
                entry.stolen_count as i64,
                entry.failed_count as i64,
                entry.notify_threshold,
                format_timestamp(entry.updated_at),
                entry.id.to_string(),
            ],
        )?;
        if updated == 1 {
            return Ok(());
        }

        let exists: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM entries WHERE id = ?",
                [entry.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Err(VaultError::Validation(format!(
                "Update to entry {} would decrease its length or counters",
                entry.id
            ))),
            None => Err(VaultError::NotFound(format!("Entry {} not found", entry.id))),
        }
    }

    fn delete_entry(&mut self, id: &Uuid) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?", [id.to_string()])?;
        Ok(deleted == 1)
    }

    fn latest_attempt(
        &mut self,
        entry_id: &Uuid,
        challenger: &Identity,
    ) -> Result<Option<AttemptRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT period, outcome, attempted_at
                FROM attempts
                WHERE entry_id = ? AND challenger = ?
                ORDER BY attempted_at DESC
                LIMIT 1
                "#,
                (entry_id.to_string(), challenger.to_string()),
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((period, outcome, attempted_at)) => {
                let outcome = AttemptOutcome::parse(&outcome).ok_or_else(|| {
                    VaultError::Storage(format!("Invalid attempt outcome: {}", outcome))
                })?;
                Ok(Some(AttemptRecord {
                    entry_id: *entry_id,
                    challenger: challenger.clone(),
                    period,
                    outcome,
                    attempted_at: parse_timestamp(&attempted_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    fn insert_attempt(&mut self, record: &AttemptRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO attempts (entry_id, challenger, period, outcome, attempted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            (
                record.entry_id.to_string(),
                record.challenger.to_string(),
                &record.period,
                record.outcome.as_str(),
                format_timestamp(record.attempted_at),
            ),
        )?;
        Ok(())
    }

    fn settle_attempt(
        &mut self,
        entry_id: &Uuid,
        challenger: &Identity,
        period: &str,
        outcome: AttemptOutcome,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE attempts SET outcome = ? WHERE entry_id = ? AND challenger = ? AND period = ?",
            (
                outcome.as_str(),
                entry_id.to_string(),
                challenger.to_string(),
                period,
            ),
        )?;
        if updated != 1 {
            return Err(VaultError::Storage(format!(
                "No admitted attempt to settle for entry {}",
                entry_id
            )));
        }
        Ok(())
    }

    fn entitlement_uses(&mut self, owner: &Identity, length: u8) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM entitlement_uses WHERE owner = ? AND passcode_length = ?",
            (owner.to_string(), length),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn record_entitlement_use(
        &mut self,
        owner: &Identity,
        length: u8,
        entry_id: &Uuid,
        applied_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO entitlement_uses (owner, passcode_length, entry_id, applied_at)
            VALUES (?, ?, ?, ?)
            "#,
            (
                owner.to_string(),
                length,
                entry_id.to_string(),
                format_timestamp(applied_at),
            ),
        )?;
        Ok(())
    }

    fn enqueue_event(&mut self, event: &OutboxEvent) -> Result<()> {
        let payload = serde_json::to_string(&event.event)
            .map_err(|e| VaultError::Storage(format!("Failed to serialize event: {}", e)))?;
        self.conn.execute(
            "INSERT INTO outbox (id, entry_id, payload_json, created_at) VALUES (?, ?, ?, ?)",
            (
                event.id.to_string(),
                event.event.entry_id().to_string(),
                payload,
                format_timestamp(event.created_at),
            ),
        )?;
        Ok(())
    }

    fn pending_events(&mut self, limit: usize) -> Result<Vec<OutboxEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, payload_json, created_at
            FROM outbox
            WHERE delivered_at IS NULL
            ORDER BY created_at, rowid
            LIMIT ?
            "#,
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, payload, created_at) = row?;
            let id = Uuid::parse_str(&id)
                .map_err(|e| VaultError::Storage(format!("Invalid event UUID: {}", e)))?;
            let event: VaultEvent = serde_json::from_str(&payload)
                .map_err(|e| VaultError::Storage(format!("Invalid event JSON: {}", e)))?;
            events.push(OutboxEvent {
                id,
                event,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(events)
    }

    fn mark_delivered(&mut self, id: &Uuid, delivered_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE outbox SET delivered_at = ? WHERE id = ? AND delivered_at IS NULL",
            (format_timestamp(delivered_at), id.to_string()),
        )?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(%err, "rollback failed");
            }
        }
    }
}

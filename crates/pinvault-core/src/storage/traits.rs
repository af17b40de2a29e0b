//! Storage engine trait definitions.
//!
//! The `VaultStore` trait is the durability seam of the core. Every mutation
//! the vault performs happens inside a [`StoreTransaction`]: reads, attempt
//! admission, entry updates and outbox writes either all commit or none do.

use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{AttemptOutcome, AttemptRecord, VaultEntry};
use crate::error::Result;
use crate::identity::Identity;
use crate::notify::OutboxEvent;

/// Durable keyed storage for vault entries.
///
/// Implementations must ensure:
/// - Transactions are serializable with respect to each other; two
///   transactions touching the same entry never interleave
/// - Dropping a transaction without committing rolls it back
/// - Keyword uniqueness is enforced by the store itself
pub trait VaultStore: Send + Sync {
    /// Start a write transaction.
    ///
    /// Blocks until any other writer has finished.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;

    /// Check stored data against the entry invariants.
    fn check_integrity(&self) -> Result<()>;

    /// Write a consistent copy of the store to `destination`.
    fn backup_to(&self, destination: &Path) -> Result<()>;
}

/// A single atomic unit of work against a [`VaultStore`].
pub trait StoreTransaction {
    // --- Entries ---

    /// Get an entry by ID.
    ///
    /// Returns `Ok(None)` if no such entry exists.
    fn entry(&mut self, id: &Uuid) -> Result<Option<VaultEntry>>;

    /// Get an entry by its exact keyword.
    fn entry_by_keyword(&mut self, keyword: &str) -> Result<Option<VaultEntry>>;

    /// Entries owned by `owner`, newest first.
    fn entries_owned_by(&mut self, owner: &Identity) -> Result<Vec<VaultEntry>>;

    /// Hidden entries whose grace deadline is at or before `now`.
    fn entries_due_for_publish(&mut self, now: DateTime<Utc>) -> Result<Vec<VaultEntry>>;

    /// Insert a new entry.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::KeywordAlreadyExists` if the keyword is taken.
    fn insert_entry(&mut self, entry: &VaultEntry) -> Result<()>;

    /// Overwrite the mutable columns of an existing entry.
    fn update_entry(&mut self, entry: &VaultEntry) -> Result<()>;

    /// Delete an entry and its attempt history.
    ///
    /// Returns `false` if the entry did not exist.
    fn delete_entry(&mut self, id: &Uuid) -> Result<bool>;

    // --- Attempt ledger ---

    /// Most recent attempt by `challenger` against `entry_id`.
    fn latest_attempt(
        &mut self,
        entry_id: &Uuid,
        challenger: &Identity,
    ) -> Result<Option<AttemptRecord>>;

    /// Record an admitted attempt.
    ///
    /// # Errors
    ///
    /// Fails if a record for the same (entry, challenger, period) exists.
    fn insert_attempt(&mut self, record: &AttemptRecord) -> Result<()>;

    /// Stamp the outcome of a previously inserted attempt.
    fn settle_attempt(
        &mut self,
        entry_id: &Uuid,
        challenger: &Identity,
        period: &str,
        outcome: AttemptOutcome,
    ) -> Result<()>;

    // --- Entitlements ---

    /// How many upgrades to `length` `owner` has already applied.
    fn entitlement_uses(&mut self, owner: &Identity, length: u8) -> Result<u32>;

    /// Record that one entitlement was applied to `entry_id`.
    fn record_entitlement_use(
        &mut self,
        owner: &Identity,
        length: u8,
        entry_id: &Uuid,
        applied_at: DateTime<Utc>,
    ) -> Result<()>;

    // --- Notification outbox ---

    /// Queue an event for delivery after commit.
    fn enqueue_event(&mut self, event: &OutboxEvent) -> Result<()>;

    /// Undelivered events, oldest first.
    fn pending_events(&mut self, limit: usize) -> Result<Vec<OutboxEvent>>;

    /// Mark an event delivered. Unknown or already-delivered ids are ignored.
    fn mark_delivered(&mut self, id: &Uuid, delivered_at: DateTime<Utc>) -> Result<()>;

    /// Commit every change made in this transaction.
    fn commit(self: Box<Self>) -> Result<()>;
}

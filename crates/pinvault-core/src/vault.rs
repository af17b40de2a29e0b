//! The vault service.
//!
//! [`Vault`] is the request-scoped entry point of the core. Every operation
//! runs in one store transaction: the entry is loaded, an expired grace
//! deadline is applied, the operation's own transition is made, and any
//! notification is written to the outbox before commit. Queued events are
//! handed to the notifier only after the transaction has committed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::feedback::{evaluate, validate_guess};
use crate::identity::Identity;
use crate::ledger::{Admission, AttemptLedger, AttemptWindow};
use crate::notify::{threshold_crossed, Notifier, OutboxEvent, VaultEvent};
use crate::ownership::{self, ChallengeOutcome, GraceResolution};
use crate::passcode::Passcode;
use crate::storage::{
    AttemptOutcome, EntryEdit, EntryView, NewVaultEntry, StoreTransaction, VaultEntry, VaultStore,
};
use crate::tier::{self, EntitlementSource};
use crate::validation::{normalize_media_urls, validate_body, validate_keyword};

/// Maximum outbox events handed to the notifier per flush.
pub const FLUSH_BATCH: usize = 256;

/// Tunables of a vault instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultSettings {
    /// How long a stolen entry stays hidden before auto-publishing
    pub grace_period: Duration,
    /// Rate-limit window applied to every entry
    pub window: AttemptWindow,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::hours(24),
            window: AttemptWindow::Rolling,
        }
    }
}

impl VaultSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_window(mut self, window: AttemptWindow) -> Self {
        self.window = window;
        self
    }
}

/// What a viewer gets back from [`Vault::fetch_entry`].
#[derive(Debug, Clone)]
pub enum EntryAccess {
    /// The viewer owns the entry and sees all of it.
    Owner(VaultEntry),
    /// Anyone else sees the public projection.
    Visitor(EntryView),
}

impl EntryAccess {
    pub fn id(&self) -> Uuid {
        match self {
            EntryAccess::Owner(entry) => entry.id,
            EntryAccess::Visitor(view) => view.id,
        }
    }
}

/// Result of handing outbox events to the notifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Vault entry service over a shared store.
pub struct Vault {
    store: Arc<dyn VaultStore>,
    entitlements: Arc<dyn EntitlementSource>,
    notifier: Arc<dyn Notifier>,
    ledger: AttemptLedger,
    settings: VaultSettings,
}

impl Vault {
    pub fn new(
        store: Arc<dyn VaultStore>,
        entitlements: Arc<dyn EntitlementSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_settings(store, entitlements, notifier, VaultSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn VaultStore>,
        entitlements: Arc<dyn EntitlementSource>,
        notifier: Arc<dyn Notifier>,
        settings: VaultSettings,
    ) -> Self {
        Self {
            store,
            entitlements,
            notifier,
            ledger: AttemptLedger::new(settings.window),
            settings,
        }
    }

    pub fn settings(&self) -> VaultSettings {
        self.settings
    }

    pub fn store(&self) -> &dyn VaultStore {
        self.store.as_ref()
    }

    /// Publish a new entry at the free passcode length.
    ///
    /// # Errors
    ///
    /// `KeywordAlreadyExists` if the keyword is taken, `Validation` for a
    /// malformed keyword, payload or passcode.
    pub fn create_entry(&self, new: NewVaultEntry, now: DateTime<Utc>) -> Result<VaultEntry> {
        validate_keyword(&new.keyword)?;
        validate_body(&new.body)?;
        let media_urls = normalize_media_urls(&new.media_urls)?;
        let passcode = Passcode::parse_with_length(&new.passcode, NewVaultEntry::initial_length())?;

        let entry = VaultEntry {
            id: Uuid::new_v4(),
            keyword: new.keyword,
            passcode_length: NewVaultEntry::initial_length(),
            passcode: Some(passcode),
            owner: new.owner,
            grace_deadline: None,
            body: new.body,
            media_urls,
            view_count: 0,
            stolen_count: 0,
            failed_count: 0,
            notify_threshold: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin()?;
        tx.insert_entry(&entry)?;
        tx.commit()?;

        tracing::info!(entry_id = %entry.id, owner = %entry.owner, "entry created");
        Ok(entry)
    }

    /// Look an entry up by keyword on behalf of `viewer`.
    ///
    /// A non-owner view counts toward `view_count`. Hidden entries do not
    /// exist for anyone but their owner.
    pub fn fetch_entry(
        &self,
        keyword: &str,
        viewer: &Identity,
        now: DateTime<Utc>,
    ) -> Result<EntryAccess> {
        self.publish_if_due(now, |tx| tx.entry_by_keyword(keyword))?;

        let mut tx = self.store.begin()?;
        let mut entry = tx
            .entry_by_keyword(keyword)?
            .ok_or_else(|| VaultError::NotFound(format!("No entry for keyword {}", keyword)))?;

        let access = if entry.is_owned_by(viewer) {
            EntryAccess::Owner(entry)
        } else if entry.is_hidden() {
            return Err(VaultError::NotFound(format!(
                "No entry for keyword {}",
                keyword
            )));
        } else {
            entry.view_count += 1;
            entry.updated_at = now;
            tx.update_entry(&entry)?;
            EntryAccess::Visitor(entry.public_view())
        };
        tx.commit()?;
        Ok(access)
    }

    /// Id of the entry behind `keyword`, as `viewer` may address it.
    ///
    /// Unlike [`Vault::fetch_entry`] this is not a view and moves no counter.
    /// Hidden entries are `NotFound` to everyone but their owner.
    pub fn resolve_keyword(
        &self,
        keyword: &str,
        viewer: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        self.publish_if_due(now, |tx| tx.entry_by_keyword(keyword))?;

        let mut tx = self.store.begin()?;
        let entry = tx.entry_by_keyword(keyword)?;
        tx.commit()?;
        match entry {
            Some(entry) if entry.is_owned_by(viewer) || !entry.is_hidden() => Ok(entry.id),
            _ => Err(VaultError::NotFound(format!(
                "No entry for keyword {}",
                keyword
            ))),
        }
    }

    /// Full entry for its owner.
    pub fn owned_entry(
        &self,
        entry_id: &Uuid,
        owner: &Identity,
        now: DateTime<Utc>,
    ) -> Result<VaultEntry> {
        self.publish_if_due(now, |tx| tx.entry(entry_id))?;

        let mut tx = self.store.begin()?;
        let entry = load(tx.as_mut(), entry_id, now)?;
        ensure_owner(&entry, owner)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Entries currently owned by `owner`, newest first.
    pub fn list_entries(&self, owner: &Identity, now: DateTime<Utc>) -> Result<Vec<VaultEntry>> {
        let mut tx = self.store.begin()?;
        let mut entries = tx.entries_owned_by(owner)?;
        for entry in entries.iter_mut() {
            if ownership::expire_if_due(entry, now) {
                tx.update_entry(entry)?;
            }
        }
        tx.commit()?;
        Ok(entries)
    }

    /// Guess the passcode of `entry_id` as `challenger`.
    ///
    /// Malformed guesses and rejected challenges consume no attempt.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown entry
    /// - `SelfChallenge` when the owner challenges their own entry
    /// - `TransferConflict` while the entry sits in its grace period
    /// - `EntryUnavailable` while an upgraded entry awaits a new passcode
    /// - `InvalidGuessFormat` for a guess of the wrong shape
    pub fn challenge(
        &self,
        entry_id: &Uuid,
        challenger: &Identity,
        guess: &str,
        now: DateTime<Utc>,
    ) -> Result<ChallengeOutcome> {
        self.publish_if_due(now, |tx| tx.entry(entry_id))?;

        let mut tx = self.store.begin()?;
        let mut entry = load(tx.as_mut(), entry_id, now)?;

        if entry.is_owned_by(challenger) {
            return Err(VaultError::SelfChallenge);
        }
        if entry.is_hidden() {
            return Err(VaultError::TransferConflict(entry.id));
        }

        let feedback = {
            let passcode = entry
                .passcode
                .as_ref()
                .ok_or(VaultError::EntryUnavailable(entry.id))?;
            validate_guess(guess, usize::from(entry.passcode_length))?;

            let ticket = match self.ledger.admit(tx.as_mut(), entry_id, challenger, now)? {
                Admission::Allowed(ticket) => ticket,
                Admission::Denied { retry_at } => {
                    tx.commit()?;
                    return Ok(ChallengeOutcome::LimitExceeded { retry_at });
                }
            };

            let feedback = evaluate(passcode.expose(), guess)?;
            let outcome = if feedback.is_solved() {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::Failure
            };
            self.ledger.settle(tx.as_mut(), ticket, outcome)?;
            feedback
        };

        let mut events = Vec::new();
        let outcome = if feedback.is_solved() {
            let previous_owner = ownership::transfer_ownership(
                &mut entry,
                challenger,
                self.settings.grace_period,
                now,
            )?;
            tx.update_entry(&entry)?;
            events.push(OutboxEvent::new(
                VaultEvent::Stolen {
                    entry_id: entry.id,
                    previous_owner: previous_owner.clone(),
                },
                now,
            ));
            tracing::info!(
                entry_id = %entry.id,
                from = %previous_owner,
                to = %challenger,
                "entry stolen"
            );
            ChallengeOutcome::Success
        } else {
            ownership::record_failure(&mut entry, now);
            tx.update_entry(&entry)?;
            if threshold_crossed(entry.failed_count, entry.notify_threshold) {
                events.push(OutboxEvent::new(
                    VaultEvent::Attempt {
                        entry_id: entry.id,
                        owner: entry.owner.clone(),
                        challenger: challenger.clone(),
                        failed_count: entry.failed_count,
                    },
                    now,
                ));
            }
            tracing::debug!(
                entry_id = %entry.id,
                %challenger,
                failed_count = entry.failed_count,
                "guess failed"
            );
            ChallengeOutcome::Failed(feedback)
        };

        for event in &events {
            tx.enqueue_event(event)?;
        }
        tx.commit()?;

        self.dispatch(&events, now);
        Ok(outcome)
    }

    /// Leave the grace state, with `passcode` if the owner supplies one.
    ///
    /// Without a passcode this only publishes an entry whose deadline has
    /// passed; before the deadline it reports `Pending`.
    pub fn resolve_grace(
        &self,
        entry_id: &Uuid,
        actor: &Identity,
        passcode: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<GraceResolution> {
        let published = self.publish_if_due(now, |tx| tx.entry(entry_id))?;

        let mut tx = self.store.begin()?;
        let mut entry = tx
            .entry(entry_id)?
            .ok_or_else(|| VaultError::NotFound(format!("Entry {} not found", entry_id)))?;
        ensure_owner(&entry, actor)?;

        let passcode = passcode
            .map(|digits| Passcode::parse_with_length(digits, entry.passcode_length))
            .transpose()?;
        let supplied = passcode.is_some();
        let expired_now = ownership::expire_if_due(&mut entry, now);
        let resolution =
            ownership::resolve(&mut entry, passcode, published || expired_now, now)?;

        if expired_now || supplied {
            tx.update_entry(&entry)?;
        }
        tx.commit()?;

        tracing::info!(entry_id = %entry.id, ?resolution, "grace resolved");
        Ok(resolution)
    }

    /// Owner passcode change. Also ends a grace period or the wait for a
    /// passcode after an upgrade.
    pub fn set_passcode(
        &self,
        entry_id: &Uuid,
        owner: &Identity,
        passcode: &str,
        now: DateTime<Utc>,
    ) -> Result<GraceResolution> {
        self.resolve_grace(entry_id, owner, Some(passcode), now)
    }

    /// Auto-publish every entry whose grace deadline has passed.
    pub fn sweep_expired_grace(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut tx = self.store.begin()?;
        let mut published = Vec::new();
        for mut entry in tx.entries_due_for_publish(now)? {
            if ownership::expire_if_due(&mut entry, now) {
                tx.update_entry(&entry)?;
                published.push(entry.id);
            }
        }
        tx.commit()?;

        if !published.is_empty() {
            tracing::info!(count = published.len(), "grace sweep published entries");
        }
        Ok(published)
    }

    pub fn edit_entry(
        &self,
        entry_id: &Uuid,
        owner: &Identity,
        edit: EntryEdit,
        now: DateTime<Utc>,
    ) -> Result<VaultEntry> {
        if edit.is_empty() {
            return Err(VaultError::InvalidInput("Nothing to edit".to_string()));
        }
        if let Some(body) = &edit.body {
            validate_body(body)?;
        }
        let media_urls = edit
            .media_urls
            .as_deref()
            .map(normalize_media_urls)
            .transpose()?;

        self.publish_if_due(now, |tx| tx.entry(entry_id))?;
        let mut tx = self.store.begin()?;
        let mut entry = load(tx.as_mut(), entry_id, now)?;
        ensure_owner(&entry, owner)?;

        if let Some(body) = edit.body {
            entry.body = body;
        }
        if let Some(media_urls) = media_urls {
            entry.media_urls = media_urls;
        }
        entry.updated_at = now;
        tx.update_entry(&entry)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Set or clear the failed-attempt notification threshold.
    pub fn set_notify_threshold(
        &self,
        entry_id: &Uuid,
        owner: &Identity,
        threshold: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<VaultEntry> {
        if threshold == Some(0) {
            return Err(VaultError::Validation(
                "Notify threshold must be at least 1".to_string(),
            ));
        }

        self.publish_if_due(now, |tx| tx.entry(entry_id))?;
        let mut tx = self.store.begin()?;
        let mut entry = load(tx.as_mut(), entry_id, now)?;
        ensure_owner(&entry, owner)?;
        entry.notify_threshold = threshold;
        entry.updated_at = now;
        tx.update_entry(&entry)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Raise the passcode length of an entry, consuming one purchase.
    ///
    /// The passcode is cleared; the entry cannot be challenged until the
    /// owner sets one of the new length.
    ///
    /// # Errors
    ///
    /// `NotOwner`, `LengthNotIncreasing`, `EntitlementMissing`, and
    /// `EntryUnavailable` while the entry is in its grace period.
    pub fn upgrade_length(
        &self,
        entry_id: &Uuid,
        owner: &Identity,
        target_length: u8,
        now: DateTime<Utc>,
    ) -> Result<VaultEntry> {
        // Read before begin(): the source may share the store's connection.
        let granted = self.entitlements.granted(owner, target_length)?;
        self.publish_if_due(now, |tx| tx.entry(entry_id))?;

        let mut tx = self.store.begin()?;
        let mut entry = load(tx.as_mut(), entry_id, now)?;
        tier::check_upgrade(&entry, owner, target_length)?;
        if entry.is_hidden() {
            return Err(VaultError::EntryUnavailable(entry.id));
        }
        if !tier::has_entitlement(granted, tx.as_mut(), owner, target_length)? {
            return Err(VaultError::EntitlementMissing(target_length));
        }

        let previous = entry.passcode_length;
        tier::apply_upgrade(&mut entry, target_length, now);
        tx.update_entry(&entry)?;
        tx.record_entitlement_use(owner, target_length, &entry.id, now)?;
        tx.commit()?;

        tracing::info!(
            entry_id = %entry.id,
            from = previous,
            to = target_length,
            "passcode length upgraded"
        );
        Ok(entry)
    }

    /// Delete an entry and its attempt history. Owner only.
    pub fn delete_entry(&self, entry_id: &Uuid, owner: &Identity) -> Result<()> {
        let mut tx = self.store.begin()?;
        let entry = tx
            .entry(entry_id)?
            .ok_or_else(|| VaultError::NotFound(format!("Entry {} not found", entry_id)))?;
        ensure_owner(&entry, owner)?;
        tx.delete_entry(entry_id)?;
        tx.commit()?;

        tracing::info!(%entry_id, "entry deleted");
        Ok(())
    }

    /// Retry delivery of every pending outbox event, oldest first.
    pub fn flush_notifications(&self, now: DateTime<Utc>) -> Result<FlushReport> {
        let pending = {
            let mut tx = self.store.begin()?;
            let pending = tx.pending_events(FLUSH_BATCH)?;
            tx.commit()?;
            pending
        };
        self.deliver(&pending, now)
    }

    /// Publish the entry `find` locates if its grace deadline has passed.
    ///
    /// Runs in a transaction of its own so the expiry is durable even when the
    /// operation that follows is rejected. Returns true if it published.
    fn publish_if_due<F>(&self, now: DateTime<Utc>, find: F) -> Result<bool>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<Option<VaultEntry>>,
    {
        let mut tx = self.store.begin()?;
        let mut published = false;
        if let Some(mut entry) = find(tx.as_mut())? {
            if ownership::expire_if_due(&mut entry, now) {
                tx.update_entry(&entry)?;
                tracing::debug!(entry_id = %entry.id, "grace period expired");
                published = true;
            }
        }
        tx.commit()?;
        Ok(published)
    }

    /// Best-effort delivery right after a commit. Failures stay queued.
    fn dispatch(&self, events: &[OutboxEvent], now: DateTime<Utc>) {
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.deliver(events, now) {
            tracing::warn!(%err, "could not record notification delivery");
        }
    }

    fn deliver(&self, events: &[OutboxEvent], now: DateTime<Utc>) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        let mut delivered = Vec::new();
        for event in events {
            match self.notifier.emit(event) {
                Ok(()) => delivered.push(event.id),
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(event_id = %event.id, %err, "notification delivery failed");
                }
            }
        }

        if !delivered.is_empty() {
            let mut tx = self.store.begin()?;
            for id in &delivered {
                tx.mark_delivered(id, now)?;
            }
            tx.commit()?;
        }
        report.delivered = delivered.len();
        Ok(report)
    }
}

/// Load an entry for a transition, applying an expired grace deadline first.
fn load(tx: &mut dyn StoreTransaction, entry_id: &Uuid, now: DateTime<Utc>) -> Result<VaultEntry> {
    let mut entry = tx
        .entry(entry_id)?
        .ok_or_else(|| VaultError::NotFound(format!("Entry {} not found", entry_id)))?;
    if ownership::expire_if_due(&mut entry, now) {
        tx.update_entry(&entry)?;
    }
    Ok(entry)
}

fn ensure_owner(entry: &VaultEntry, identity: &Identity) -> Result<()> {
    if entry.is_owned_by(identity) {
        Ok(())
    } else {
        Err(VaultError::NotOwner(entry.id))
    }
}

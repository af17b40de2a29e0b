//! Attempt ledger: one evaluated challenge per entry, challenger and day.
//!
//! Admission writes a pending [`AttemptRecord`] inside the caller's store
//! transaction. Because the store serializes transactions, two concurrent
//! requests from the same challenger cannot both see an empty ledger.

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::Result;
use crate::identity::Identity;
use crate::storage::{AttemptOutcome, AttemptRecord, StoreTransaction};

/// How "once per day" is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptWindow {
    /// 24 hours from the challenger's last admitted attempt.
    #[default]
    Rolling,
    /// One attempt per calendar day in the given timezone.
    CalendarDay(Tz),
}

impl AttemptWindow {
    const ROLLING_HOURS: i64 = 24;

    /// Label of the period `now` falls in, used as part of the record key.
    pub fn period_label(&self, now: DateTime<Utc>) -> String {
        match self {
            // A rolling period is anchored at the attempt that opens it.
            AttemptWindow::Rolling => now.to_rfc3339_opts(SecondsFormat::Micros, true),
            AttemptWindow::CalendarDay(tz) => {
                now.with_timezone(tz).date_naive().format("%Y-%m-%d").to_string()
            }
        }
    }

    /// Earliest instant after `last` at which a new attempt is admitted.
    pub fn next_admission(&self, last: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            AttemptWindow::Rolling => last + Duration::hours(Self::ROLLING_HOURS),
            AttemptWindow::CalendarDay(tz) => {
                let next_day = last.with_timezone(tz).date_naive().succ_opt();
                next_day
                    .and_then(|day| day.and_hms_opt(0, 0, 0))
                    .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
                    .map(|local| local.with_timezone(&Utc))
                    // Midnight skipped by a DST change: fall back to a full day.
                    .unwrap_or_else(|| last + Duration::hours(Self::ROLLING_HOURS))
            }
        }
    }

    /// Whether an attempt made at `last` still blocks a new one at `now`.
    pub fn blocks(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < self.next_admission(last)
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The attempt was recorded as pending; settle it with the ticket.
    Allowed(AttemptTicket),
    /// The challenger already used this period's attempt.
    Denied { retry_at: DateTime<Utc> },
}

/// Proof of admission, consumed by [`AttemptLedger::settle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTicket {
    entry_id: Uuid,
    challenger: Identity,
    period: String,
    attempted_at: DateTime<Utc>,
}

/// Rate-limit gate over the store's attempt records.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptLedger {
    window: AttemptWindow,
}

impl AttemptLedger {
    pub fn new(window: AttemptWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> AttemptWindow {
        self.window
    }

    /// Admit `challenger` to attempt `entry_id` at `now`, or deny.
    ///
    /// On `Allowed` a pending record has been written in `tx`; it disappears
    /// if the transaction is not committed.
    pub fn admit(
        &self,
        tx: &mut dyn StoreTransaction,
        entry_id: &Uuid,
        challenger: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        if let Some(last) = tx.latest_attempt(entry_id, challenger)? {
            if self.window.blocks(last.attempted_at, now) {
                let retry_at = self.window.next_admission(last.attempted_at);
                tracing::debug!(%entry_id, %challenger, %retry_at, "attempt denied");
                return Ok(Admission::Denied { retry_at });
            }
        }

        let period = self.window.period_label(now);
        tx.insert_attempt(&AttemptRecord {
            entry_id: *entry_id,
            challenger: challenger.clone(),
            period: period.clone(),
            outcome: AttemptOutcome::Pending,
            attempted_at: now,
        })?;
        tracing::debug!(%entry_id, %challenger, %period, "attempt admitted");

        Ok(Admission::Allowed(AttemptTicket {
            entry_id: *entry_id,
            challenger: challenger.clone(),
            period,
            attempted_at: now,
        }))
    }

    /// Stamp the evaluated outcome on an admitted attempt.
    pub fn settle(
        &self,
        tx: &mut dyn StoreTransaction,
        ticket: AttemptTicket,
        outcome: AttemptOutcome,
    ) -> Result<AttemptRecord> {
        tx.settle_attempt(&ticket.entry_id, &ticket.challenger, &ticket.period, outcome)?;
        Ok(AttemptRecord {
            entry_id: ticket.entry_id,
            challenger: ticket.challenger,
            period: ticket.period,
            outcome,
            attempted_at: ticket.attempted_at,
        })
    }
}

//! Notification contract.
//!
//! Qualifying transitions write an [`OutboxEvent`] in the same store
//! transaction that commits them. After commit the vault hands pending events
//! to a [`Notifier`]; an event stays pending until delivery succeeds, so the
//! collaborator may see the same event id more than once and must treat
//! redelivery as a no-op.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::identity::Identity;

/// Something the owner of an entry should hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// The entry was stolen from `previous_owner`.
    Stolen {
        entry_id: Uuid,
        previous_owner: Identity,
    },
    /// Failed guesses against the entry reached the owner's threshold.
    Attempt {
        entry_id: Uuid,
        owner: Identity,
        challenger: Identity,
        failed_count: u64,
    },
}

impl VaultEvent {
    pub fn entry_id(&self) -> Uuid {
        match self {
            VaultEvent::Stolen { entry_id, .. } | VaultEvent::Attempt { entry_id, .. } => *entry_id,
        }
    }

    /// Identity the event is addressed to.
    pub fn recipient(&self) -> &Identity {
        match self {
            VaultEvent::Stolen { previous_owner, .. } => previous_owner,
            VaultEvent::Attempt { owner, .. } => owner,
        }
    }
}

/// An event persisted for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Idempotency key for the collaborator
    pub id: Uuid,
    pub event: VaultEvent,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn new(event: VaultEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            created_at,
        }
    }
}

/// True when a failure count lands on a multiple of the owner's threshold.
pub fn threshold_crossed(failed_count: u64, threshold: Option<u32>) -> bool {
    match threshold {
        Some(threshold) if threshold > 0 => failed_count % u64::from(threshold) == 0,
        _ => false,
    }
}

/// External notification collaborator.
pub trait Notifier: Send + Sync {
    /// Deliver one event. Returning an error leaves it pending for a later flush.
    fn emit(&self, event: &OutboxEvent) -> Result<()>;
}

/// Drops every event. Used when no transport is configured.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn emit(&self, _event: &OutboxEvent) -> Result<()> {
        Ok(())
    }
}

/// Hands events to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn emit(&self, event: &OutboxEvent) -> Result<()> {
        let payload = serde_json::to_string(&event.event)?;
        tracing::info!(
            event_id = %event.id,
            entry_id = %event.event.entry_id(),
            recipient = %event.event.recipient(),
            %payload,
            "notification"
        );
        Ok(())
    }
}

/// Keeps delivered events in memory, optionally failing every delivery.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    delivered: Mutex<Vec<OutboxEvent>>,
    failing: Mutex<bool>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn delivered(&self) -> Vec<OutboxEvent> {
        self.delivered
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn emit(&self, event: &OutboxEvent) -> Result<()> {
        let failing = *self
            .failing
            .lock()
            .map_err(|_| VaultError::Notify("notifier state poisoned".to_string()))?;
        if failing {
            return Err(VaultError::Notify("transport unavailable".to_string()));
        }
        self.delivered
            .lock()
            .map_err(|_| VaultError::Notify("notifier state poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_crossed_on_multiples() {
        assert!(!threshold_crossed(1, Some(3)));
        assert!(!threshold_crossed(2, Some(3)));
        assert!(threshold_crossed(3, Some(3)));
        assert!(!threshold_crossed(4, Some(3)));
        assert!(threshold_crossed(6, Some(3)));
        assert!(threshold_crossed(1, Some(1)));
    }

    #[test]
    fn test_threshold_disabled() {
        assert!(!threshold_crossed(5, None));
        assert!(!threshold_crossed(5, Some(0)));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = VaultEvent::Stolen {
            entry_id: Uuid::nil(),
            previous_owner: Identity::device("d-1"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stolen");
        assert_eq!(json["previous_owner"]["kind"], "device");

        let back: VaultEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.recipient(), &Identity::device("d-1"));
    }

    #[test]
    fn test_memory_notifier_failure_mode() {
        let notifier = MemoryNotifier::new();
        let event = OutboxEvent::new(
            VaultEvent::Stolen {
                entry_id: Uuid::new_v4(),
                previous_owner: Identity::account("a-1"),
            },
            Utc::now(),
        );

        notifier.set_failing(true);
        assert!(notifier.emit(&event).is_err());
        assert!(notifier.delivered().is_empty());

        notifier.set_failing(false);
        notifier.emit(&event).unwrap();
        assert_eq!(notifier.delivered().len(), 1);
    }
}

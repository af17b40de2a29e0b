//! # PinVault Core
//!
//! Core library for PinVault: keyword-addressed notes guarded by a numeric
//! passcode that anyone who finds the keyword may try to guess once a day.
//! A correct guess transfers ownership of the note.
//!
//! This crate provides the domain logic, storage abstraction and data model
//! independent of any front end.
//!
//! ## Architecture
//!
//! - **feedback**: Guess evaluator producing positional hints
//! - **ledger**: One-attempt-per-period admission
//! - **ownership**: Ownership transfer and grace-period state machine
//! - **tier**: Passcode-length upgrades and purchase entitlements
//! - **notify**: Outbox events and the notification collaborator
//! - **storage**: Storage trait and the SQLite implementation
//! - **vault**: The service composing all of the above

pub mod error;
pub mod feedback;
pub mod fs;
pub mod identity;
pub mod ledger;
pub mod notify;
pub mod ownership;
pub mod passcode;
pub mod storage;
pub mod tier;
pub mod validation;
pub mod vault;

pub use error::{Result, VaultError};
pub use feedback::{evaluate, Feedback, Hint};
pub use identity::Identity;
pub use ledger::{AttemptLedger, AttemptWindow};
pub use notify::{Notifier, OutboxEvent, VaultEvent};
pub use ownership::{ChallengeOutcome, EntryState, GraceResolution, WireOutcome};
pub use passcode::Passcode;
pub use storage::{SqliteVaultStore, VaultStore};
pub use tier::EntitlementSource;
pub use vault::{EntryAccess, FlushReport, Vault, VaultSettings};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

//! Error types for PinVault core operations.
//!
//! Errors are descriptive at the core level; the CLI layer maps them to
//! exit codes and user-facing messages. No variant ever carries passcode
//! material.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for PinVault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Core error type for PinVault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Unknown keyword or entry id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another entry already uses this keyword
    #[error("Keyword already exists: {0}")]
    KeywordAlreadyExists(String),

    /// Guess is not a digit string of the entry's passcode length
    #[error("Invalid guess format: expected {expected} digits")]
    InvalidGuessFormat { expected: usize },

    /// Caller does not own the entry
    #[error("Not the owner of entry {0}")]
    NotOwner(Uuid),

    /// Passcode length upgrade does not increase the length
    #[error("Passcode length must increase (current {current}, requested {requested})")]
    LengthNotIncreasing { current: u8, requested: u8 },

    /// No unconsumed entitlement for the requested length
    #[error("No entitlement for passcode length {0}")]
    EntitlementMissing(u8),

    /// The entry changed hands before this challenge could be applied
    #[error("Entry {0} changed owner; challenge rejected")]
    TransferConflict(Uuid),

    /// Entry exists but cannot be challenged right now
    #[error("Entry {0} is unavailable")]
    EntryUnavailable(Uuid),

    /// Owners cannot challenge their own entry
    #[error("Cannot challenge an entry you own")]
    SelfChallenge,

    /// Durability layer failure
    #[error("Store unavailable: {source}")]
    StoreUnavailable {
        #[from]
        source: rusqlite::Error,
    },

    /// Storage backend error (decoding, file handling)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Notification collaborator rejected an event
    #[error("Notification delivery failed: {0}")]
    Notify(String),
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

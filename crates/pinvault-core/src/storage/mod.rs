//! Storage abstraction for PinVault.
//!
//! This module defines the `VaultStore` trait and the types that cross it.
//!
//! ## Architecture
//!
//! The vault only talks to storage through [`VaultStore`] and the
//! [`StoreTransaction`] it hands out, so the SQLite backend can be swapped for
//! any store that offers serializable transactions and keyword uniqueness.

pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export public types
pub use sqlite::SqliteVaultStore;
pub use traits::{StoreTransaction, VaultStore};
pub use types::{AttemptOutcome, AttemptRecord, EntryEdit, EntryView, NewVaultEntry, VaultEntry};

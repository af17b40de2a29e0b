//! Application-level utilities for the PinVault CLI.
//!
//! This module provides:
//! - Path resolution for config and store files
//! - Acting identity and entry resolution
//! - The per-invocation context that opens the vault

mod context;
mod resolver;

// Re-export public API
pub use context::AppContext;
pub use resolver::{resolve_config_path, resolve_entry_id};

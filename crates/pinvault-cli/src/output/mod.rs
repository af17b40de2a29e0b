//! Output formatting helpers for the CLI.
//!
//! This module provides formatting utilities for displaying entries and
//! challenge outcomes as JSON or text.

mod json;
mod text;

// Re-export public API
pub use json::{entry_json, outcome_json, view_json};
pub use text::{entry_rows, print_entry, print_outcome, print_view, ENTRY_COLUMNS};

//! UI primitives for the PinVault CLI.
//!
//! - **Context**: Environment detection (TTY, color)
//! - **Mode**: Output mode resolution (json, plain, pretty)
//! - **Render**: Tables, badges, key/value lines

mod context;
mod mode;
pub mod render;

pub use context::UiContext;
pub use render::{badge, hint, kv, simple_table, Badge, Column};

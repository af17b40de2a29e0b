//! Rendering primitives for CLI output.

use comfy_table::presets::NOTHING;
use comfy_table::{Attribute, Cell, ContentArrangement, Table as ComfyTable};
use owo_colors::OwoColorize;

use super::context::UiContext;

/// Badge types for status indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Ok,
    Warn,
    Err,
}

impl Badge {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Warn => "[WARN]",
            Self::Err => "[ERR]",
        }
    }
}

/// Column definition for tables.
#[derive(Debug, Clone)]
pub struct Column {
    pub header: &'static str,
}

impl Column {
    pub const fn new(header: &'static str) -> Self {
        Self { header }
    }
}

/// Render a badge with optional message.
pub fn badge(ctx: &UiContext, kind: Badge, message: &str) -> String {
    let text = kind.text();
    let colored = if ctx.color {
        match kind {
            Badge::Ok => text.green().to_string(),
            Badge::Warn => text.yellow().to_string(),
            Badge::Err => text.red().to_string(),
        }
    } else {
        text.to_string()
    };

    if message.is_empty() {
        colored
    } else {
        format!("{} {}", colored, message)
    }
}

/// Render a `Label: value` line with a dimmed label.
pub fn kv(ctx: &UiContext, label: &str, value: &str) -> String {
    if ctx.color {
        format!("{} {}", format!("{}:", label).dimmed(), value)
    } else {
        format!("{}: {}", label, value)
    }
}

/// Render a hint line.
pub fn hint(ctx: &UiContext, message: &str) -> String {
    if ctx.color {
        format!("Hint: {}", message).dimmed().to_string()
    } else {
        format!("Hint: {}", message)
    }
}

/// Render a borderless table.
///
/// Pretty mode: aligned columns with a dimmed header
/// Plain mode: space-separated values (no header)
pub fn simple_table(ctx: &UiContext, columns: &[Column], rows: &[Vec<String>]) -> String {
    if ctx.mode.is_pretty() {
        let mut table = ComfyTable::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        let header_cells: Vec<Cell> = columns
            .iter()
            .map(|c| {
                let mut cell = Cell::new(c.header);
                if ctx.color {
                    cell = cell.add_attribute(Attribute::Dim);
                }
                cell
            })
            .collect();
        table.set_header(header_cells);

        for i in 0..columns.len() {
            if let Some(column) = table.column_mut(i) {
                column.set_padding((0, 2));
            }
        }

        for row in rows {
            table.add_row(row);
        }

        table.to_string()
    } else {
        rows.iter()
            .map(|row| row.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

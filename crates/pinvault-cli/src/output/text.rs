//! Text output formatting.

use pinvault_core::storage::{EntryView, VaultEntry};
use pinvault_core::{ChallengeOutcome, EntryState};

use crate::ui::{badge, kv, Badge, Column, UiContext};

/// Columns of the `list` table.
pub const ENTRY_COLUMNS: [Column; 7] = [
    Column::new("KEYWORD"),
    Column::new("ID"),
    Column::new("LEN"),
    Column::new("STATE"),
    Column::new("VIEWS"),
    Column::new("STOLEN"),
    Column::new("FAILED"),
];

fn state_label(entry: &VaultEntry) -> String {
    match (EntryState::of(entry), entry.passcode.is_some()) {
        (EntryState::GraceHidden { deadline }, _) => {
            format!("hidden until {}", deadline.format("%Y-%m-%d %H:%M UTC"))
        }
        (EntryState::Public, true) => "public".to_string(),
        (EntryState::Public, false) => "needs passcode".to_string(),
    }
}

/// Table rows for a list of owned entries.
pub fn entry_rows(entries: &[VaultEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            vec![
                entry.keyword.clone(),
                entry.id.to_string(),
                entry.passcode_length.to_string(),
                state_label(entry),
                entry.view_count.to_string(),
                entry.stolen_count.to_string(),
                entry.failed_count.to_string(),
            ]
        })
        .collect()
}

/// Print an owned entry in human-readable format.
pub fn print_entry(ctx: &UiContext, entry: &VaultEntry, reveal: bool, quiet: bool) {
    if !quiet {
        println!("{}", kv(ctx, "ID", &entry.id.to_string()));
        println!("{}", kv(ctx, "Keyword", &entry.keyword));
        println!("{}", kv(ctx, "Owner", &entry.owner.to_string()));
        println!("{}", kv(ctx, "State", &state_label(entry)));
        let passcode = match (&entry.passcode, reveal) {
            (Some(passcode), true) => passcode.expose().to_string(),
            (Some(_), false) => format!("{} digits (use --reveal)", entry.passcode_length),
            (None, _) => format!("unset ({} digits required)", entry.passcode_length),
        };
        println!("{}", kv(ctx, "Passcode", &passcode));
        println!(
            "{}",
            kv(
                ctx,
                "Counts",
                &format!(
                    "{} views, {} stolen, {} failed",
                    entry.view_count, entry.stolen_count, entry.failed_count
                )
            )
        );
        if let Some(threshold) = entry.notify_threshold {
            println!(
                "{}",
                kv(ctx, "Notify", &format!("every {} failed attempts", threshold))
            );
        }
        for url in &entry.media_urls {
            println!("{}", kv(ctx, "Media", url));
        }
        println!();
    }
    println!("{}", entry.body);
}

/// Print what a visitor sees.
pub fn print_view(ctx: &UiContext, view: &EntryView, quiet: bool) {
    if !quiet {
        println!("{}", kv(ctx, "ID", &view.id.to_string()));
        println!("{}", kv(ctx, "Keyword", &view.keyword));
        println!(
            "{}",
            kv(ctx, "Passcode", &format!("{} digits", view.passcode_length))
        );
        println!(
            "{}",
            kv(
                ctx,
                "Counts",
                &format!(
                    "{} views, {} stolen, {} failed",
                    view.view_count, view.stolen_count, view.failed_count
                )
            )
        );
        for url in &view.media_urls {
            println!("{}", kv(ctx, "Media", url));
        }
        println!();
    }
    println!("{}", view.body);
}

/// Print a challenge outcome.
///
/// Plain mode prints only the wire form so scripts can parse it.
pub fn print_outcome(ctx: &UiContext, outcome: &ChallengeOutcome) {
    if !ctx.mode.is_pretty() {
        println!("{}", outcome.to_wire());
        return;
    }
    match outcome {
        ChallengeOutcome::Success => {
            println!("{}", badge(ctx, Badge::Ok, "Correct! The entry is yours."));
            println!("Set a passcode before the grace period ends with `pinvault set-passcode`.");
        }
        ChallengeOutcome::Failed(feedback) => {
            println!("{}", badge(ctx, Badge::Warn, &format!("Wrong: {}", feedback)));
            println!("◎ right digit, right place  ○ right digit, wrong place  × not in the passcode");
        }
        ChallengeOutcome::LimitExceeded { retry_at } => {
            println!(
                "{}",
                badge(
                    ctx,
                    Badge::Err,
                    &format!(
                        "Already tried today; next attempt at {}",
                        retry_at.format("%Y-%m-%d %H:%M UTC")
                    )
                )
            );
        }
    }
}

use pinvault_core::EntryAccess;

use crate::app::AppContext;
use crate::cli::ShowArgs;
use crate::output::{entry_json, print_entry, print_view, view_json};

pub fn handle_show(ctx: &AppContext, args: &ShowArgs) -> anyhow::Result<()> {
    let viewer = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;

    match vault.fetch_entry(&args.keyword, &viewer, ctx.now())? {
        EntryAccess::Owner(entry) => {
            if ctx.ui().mode.is_json() {
                let output = serde_json::to_string_pretty(&entry_json(&entry, args.reveal))?;
                println!("{}", output);
            } else {
                print_entry(ctx.ui(), &entry, args.reveal, ctx.quiet());
            }
        }
        EntryAccess::Visitor(view) => {
            if args.reveal {
                tracing::debug!(entry_id = %view.id, "--reveal ignored for non-owner");
            }
            if ctx.ui().mode.is_json() {
                println!("{}", serde_json::to_string_pretty(&view_json(&view))?);
            } else {
                print_view(ctx.ui(), &view, ctx.quiet());
            }
        }
    }
    Ok(())
}

use pinvault_core::storage::EntryEdit;

use crate::app::{resolve_entry_id, AppContext};
use crate::cli::EditArgs;
use crate::errors::CliError;
use crate::output::{entry_json, print_entry};

pub fn handle_edit(ctx: &AppContext, args: &EditArgs) -> anyhow::Result<()> {
    let mut edit = EntryEdit::new();
    if let Some(body) = args.body.clone() {
        edit = edit.body(body);
    }
    if args.clear_media {
        edit = edit.media(Vec::new());
    } else if !args.media.is_empty() {
        edit = edit.media(args.media.clone());
    }
    if edit.is_empty() {
        return Err(CliError::invalid_input("Pass --body, --media or --clear-media").into());
    }

    let owner = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;
    let now = ctx.now();
    let entry_id = resolve_entry_id(&vault, &args.entry, &owner, now)?;
    let entry = vault.edit_entry(&entry_id, &owner, edit, now)?;

    if ctx.ui().mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&entry_json(&entry, false))?);
    } else if !ctx.quiet() {
        println!("Updated entry {}", entry.id);
        print_entry(ctx.ui(), &entry, false, true);
    }
    Ok(())
}

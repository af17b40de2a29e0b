use pinvault_core::storage::NewVaultEntry;

use crate::app::AppContext;
use crate::cli::CreateArgs;
use crate::helpers::read_passcode;
use crate::output::{entry_json, print_entry};

pub fn handle_create(ctx: &AppContext, args: &CreateArgs) -> anyhow::Result<()> {
    let owner = ctx.identity()?;
    let passcode = read_passcode(ctx.ui(), args.passcode.clone(), "Passcode (3 digits)")?;
    let (vault, _store) = ctx.open_vault()?;

    let new_entry = NewVaultEntry::new(args.keyword.clone(), args.body.clone(), owner, passcode)
        .with_media(args.media.clone());
    let entry = vault.create_entry(new_entry, ctx.now())?;

    if ctx.ui().mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&entry_json(&entry, false))?);
    } else if ctx.quiet() {
        println!("{}", entry.id);
    } else {
        println!("Created entry {}", entry.id);
        print_entry(ctx.ui(), &entry, false, true);
    }
    Ok(())
}

use pinvault_core::Identity;

use crate::app::{resolve_entry_id, AppContext};
use crate::cli::{GrantArgs, UpgradeArgs};
use crate::errors::CliError;
use crate::output::entry_json;

pub fn handle_upgrade(ctx: &AppContext, args: &UpgradeArgs) -> anyhow::Result<()> {
    let owner = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;
    let now = ctx.now();
    let entry_id = resolve_entry_id(&vault, &args.entry, &owner, now)?;

    let entry = vault.upgrade_length(&entry_id, &owner, args.length, now)?;

    if ctx.ui().mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&entry_json(&entry, false))?);
    } else if !ctx.quiet() {
        println!(
            "Entry {} now takes a {}-digit passcode",
            entry.id, entry.passcode_length
        );
        println!("Set one with `pinvault set-passcode {}`", entry.keyword);
    }
    Ok(())
}

pub fn handle_grant(ctx: &AppContext, args: &GrantArgs) -> anyhow::Result<()> {
    let owner = match args.owner.as_deref() {
        Some(value) => value
            .parse::<Identity>()
            .map_err(|e| CliError::invalid_input(format!("Invalid --owner value: {}", e)))?,
        None => ctx.identity()?,
    };
    let store = ctx.open_store()?;
    let recorded = store.record_grant(&owner, args.length, &args.reference, ctx.now())?;

    if ctx.ui().mode.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "owner": owner.to_string(),
                "length": args.length,
                "reference": args.reference,
                "recorded": recorded,
            }))?
        );
    } else if !ctx.quiet() {
        if recorded {
            println!("Recorded {}-digit purchase for {}", args.length, owner);
        } else {
            println!("Purchase {} was already recorded", args.reference);
        }
    }
    Ok(())
}

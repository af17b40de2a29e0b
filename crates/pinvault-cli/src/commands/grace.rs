use pinvault_core::GraceResolution;

use crate::app::{resolve_entry_id, AppContext};
use crate::cli::SetPasscodeArgs;
use crate::helpers::read_passcode;

pub fn handle_set_passcode(ctx: &AppContext, args: &SetPasscodeArgs) -> anyhow::Result<()> {
    let owner = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;
    let now = ctx.now();
    let entry_id = resolve_entry_id(&vault, &args.entry, &owner, now)?;
    let passcode = read_passcode(ctx.ui(), args.passcode.clone(), "New passcode")?;

    let resolution = vault.set_passcode(&entry_id, &owner, &passcode, now)?;

    if ctx.ui().mode.is_json() {
        let published = matches!(resolution, GraceResolution::Published);
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "id": entry_id,
                "published": published,
            }))?
        );
    } else if !ctx.quiet() {
        match resolution {
            GraceResolution::Published => println!("Passcode set; entry {} is public again", entry_id),
            _ => println!("Passcode set for entry {}", entry_id),
        }
    }
    Ok(())
}

pub fn handle_sweep(ctx: &AppContext) -> anyhow::Result<()> {
    let (vault, _store) = ctx.open_vault()?;
    let published = vault.sweep_expired_grace(ctx.now())?;

    if ctx.ui().mode.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "published": published }))?
        );
    } else if !ctx.quiet() {
        println!("Published {} entries", published.len());
        for id in &published {
            println!("{}", id);
        }
    }
    Ok(())
}

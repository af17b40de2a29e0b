use crate::app::{resolve_entry_id, AppContext};
use crate::cli::NotifyArgs;
use crate::errors::CliError;

pub fn handle_notify(ctx: &AppContext, args: &NotifyArgs) -> anyhow::Result<()> {
    let threshold = match (args.every, args.off) {
        (Some(every), false) => Some(every),
        (None, true) => None,
        _ => return Err(CliError::invalid_input("Pass --every <N> or --off").into()),
    };

    let owner = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;
    let now = ctx.now();
    let entry_id = resolve_entry_id(&vault, &args.entry, &owner, now)?;
    let entry = vault.set_notify_threshold(&entry_id, &owner, threshold, now)?;

    if !ctx.quiet() {
        match entry.notify_threshold {
            Some(n) => println!("Notifying after every {} failed attempts", n),
            None => println!("Failed-attempt notifications off"),
        }
    }
    Ok(())
}

use crate::app::{resolve_entry_id, AppContext};
use crate::cli::DeleteArgs;
use crate::helpers::confirm;

pub fn handle_delete(ctx: &AppContext, args: &DeleteArgs) -> anyhow::Result<()> {
    let owner = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;
    let entry_id = resolve_entry_id(&vault, &args.entry, &owner, ctx.now())?;

    if !args.yes && !confirm(ctx.ui(), &format!("Delete entry {}?", args.entry))? {
        return Err(anyhow::anyhow!("Delete cancelled"));
    }
    vault.delete_entry(&entry_id, &owner)?;

    if !ctx.quiet() {
        println!("Deleted entry {}", entry_id);
    }
    Ok(())
}

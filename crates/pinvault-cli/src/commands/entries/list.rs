use crate::app::AppContext;
use crate::output::{entry_json, entry_rows, ENTRY_COLUMNS};
use crate::ui::{hint, simple_table};

pub fn handle_list(ctx: &AppContext) -> anyhow::Result<()> {
    let owner = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;
    let entries = vault.list_entries(&owner, ctx.now())?;

    if ctx.ui().mode.is_json() {
        let values: Vec<_> = entries.iter().map(|entry| entry_json(entry, false)).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    if entries.is_empty() {
        if !ctx.quiet() {
            println!("No entries.");
            println!("{}", hint(ctx.ui(), "Create one with `pinvault create <keyword>`."));
        }
        return Ok(());
    }
    println!("{}", simple_table(ctx.ui(), &ENTRY_COLUMNS, &entry_rows(&entries)));
    Ok(())
}

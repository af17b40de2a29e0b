use std::path::Path;

use pinvault_core::VaultStore;

use crate::app::AppContext;
use crate::cli::BackupArgs;
use crate::helpers::confirm;

pub fn handle_backup(ctx: &AppContext, args: &BackupArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let destination = Path::new(&args.destination);

    if destination.exists()
        && !confirm(
            ctx.ui(),
            &format!("Overwrite existing backup at {}?", args.destination),
        )?
    {
        return Err(anyhow::anyhow!("Backup cancelled"));
    }
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create backup directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    store.backup_to(destination)?;
    if !ctx.quiet() {
        println!("Backed up vault to {}", args.destination);
    }
    Ok(())
}

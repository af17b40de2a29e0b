use pinvault_core::VaultStore;

use crate::app::AppContext;
use crate::ui::{badge, hint, Badge};

pub fn handle_check(ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    match store.check_integrity() {
        Ok(()) => {
            if !ctx.quiet() {
                println!("{}", badge(ctx.ui(), Badge::Ok, "Integrity check passed"));
                println!("- foreign keys: OK");
                println!("- passcodes: OK");
                println!("- grace state: OK");
                println!("- attempts: OK");
                println!("- entitlements: OK");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", badge(ctx.ui(), Badge::Err, "Integrity check failed"));
            eprintln!("{}", hint(ctx.ui(), "Restore from a backup before retrying."));
            Err(anyhow::Error::new(err).context("Integrity check failed"))
        }
    }
}

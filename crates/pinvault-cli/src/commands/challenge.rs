use crate::app::{resolve_entry_id, AppContext};
use crate::cli::ChallengeArgs;
use crate::output::{outcome_json, print_outcome};

pub fn handle_challenge(ctx: &AppContext, args: &ChallengeArgs) -> anyhow::Result<()> {
    let challenger = ctx.identity()?;
    let (vault, _store) = ctx.open_vault()?;
    let now = ctx.now();
    let entry_id = resolve_entry_id(&vault, &args.entry, &challenger, now)?;

    let outcome = vault.challenge(&entry_id, &challenger, &args.guess, now)?;

    if ctx.ui().mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    } else {
        print_outcome(ctx.ui(), &outcome);
    }
    Ok(())
}

use crate::app::AppContext;

pub fn handle_flush(ctx: &AppContext) -> anyhow::Result<()> {
    let (vault, _store) = ctx.open_vault()?;
    let report = vault.flush_notifications(ctx.now())?;

    if ctx.ui().mode.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "delivered": report.delivered,
                "failed": report.failed,
            }))?
        );
    } else if !ctx.quiet() {
        println!(
            "Delivered {} notifications ({} failed)",
            report.delivered, report.failed
        );
    }
    if report.failed > 0 {
        return Err(anyhow::anyhow!(
            "{} notifications could not be delivered",
            report.failed
        ));
    }
    Ok(())
}

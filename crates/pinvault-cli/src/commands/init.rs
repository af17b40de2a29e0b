use std::path::PathBuf;

use pinvault_core::{Identity, SqliteVaultStore};
use uuid::Uuid;

use crate::app::resolve_config_path;
use crate::cli::{Cli, InitArgs, WindowArg};
use crate::config::{default_store_path, write_config, ChallengeSection, PinvaultConfig, WindowKind};
use crate::errors::CliError;

pub fn handle_init(cli: &Cli, args: &InitArgs) -> anyhow::Result<()> {
    let config_path = match args.config_path.as_deref() {
        Some(path) => PathBuf::from(path),
        None => resolve_config_path()?,
    };
    if config_path.exists() {
        return Err(CliError::invalid_input(format!(
            "Config already exists at {}",
            config_path.display()
        ))
        .into());
    }

    let store_path = match args.path.as_deref().or(cli.store.as_deref()) {
        Some(path) => PathBuf::from(path),
        None => default_store_path()?,
    };
    if store_path.exists() {
        return Err(CliError::invalid_input(format!(
            "A file already exists at {}",
            store_path.display()
        ))
        .into());
    }

    let challenge = ChallengeSection {
        window: match args.window {
            WindowArg::Rolling => WindowKind::Rolling,
            WindowArg::CalendarDay => WindowKind::CalendarDay,
        },
        timezone: args.timezone.clone(),
        grace_period_hours: args.grace_period_hours,
    };
    // Reject a bad timezone or grace period before touching the filesystem.
    challenge
        .settings()
        .map_err(|e| CliError::invalid_input(e.to_string()))?;

    let device_token = match args.device_token.as_deref() {
        Some(token) => {
            format!("device:{}", token)
                .parse::<Identity>()
                .map_err(|e| CliError::invalid_input(format!("Invalid device token: {}", e)))?;
            token.to_string()
        }
        None => Uuid::new_v4().to_string(),
    };

    if let Some(parent) = store_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("Failed to create store directory {}: {}", parent.display(), e)
            })?;
        }
    }
    SqliteVaultStore::create(&store_path)?;

    let config = PinvaultConfig::new(store_path.clone(), device_token.clone(), challenge);
    write_config(&config_path, &config)?;
    tracing::info!(store = %store_path.display(), "vault initialized");

    if !cli.quiet {
        println!("Initialized vault at {}", store_path.display());
        println!("Config written to {}", config_path.display());
        println!("Acting as device:{}", device_token);
    }
    Ok(())
}

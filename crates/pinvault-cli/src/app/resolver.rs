//! Path, identity and entry resolution.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pinvault_core::{Identity, Vault};
use uuid::Uuid;

use crate::cli::Cli;
use crate::config::{default_config_path, PinvaultConfig};
use crate::constants::CONFIG_ENV;
use crate::errors::CliError;

/// Resolve the config file path, checking PINVAULT_CONFIG env var first.
pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(CONFIG_ENV) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

/// Resolve the store path from CLI args or config.
pub fn resolve_store_path(cli: &Cli, config: Option<&PinvaultConfig>) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli.store.as_deref() {
        return Ok(PathBuf::from(path));
    }
    match config {
        Some(config) => Ok(PathBuf::from(&config.store.path)),
        None => {
            let config_path = resolve_config_path()?;
            Err(CliError::not_found(
                missing_config_message(&config_path),
                "Hint: Run `pinvault init` or pass --store.",
            )
            .into())
        }
    }
}

/// Resolve the acting identity: `--as` wins over the configured device token.
pub fn resolve_identity(cli: &Cli, config: Option<&PinvaultConfig>) -> anyhow::Result<Identity> {
    if let Some(value) = cli.identity.as_deref() {
        return value
            .parse::<Identity>()
            .map_err(|e| CliError::invalid_input(format!("Invalid --as value: {}", e)).into());
    }
    match config {
        Some(config) => Ok(Identity::device(config.identity.device_token.clone())),
        None => Err(CliError::not_found(
            "No identity configured",
            "Hint: Run `pinvault init` or pass --as device:<token>.",
        )
        .into()),
    }
}

/// Accept either an entry ID or a keyword.
///
/// Keywords never parse as UUIDs, so the two cannot collide. A keyword
/// lookup is not a view; hidden entries stay hidden from non-owners.
pub fn resolve_entry_id(
    vault: &Vault,
    entry: &str,
    viewer: &Identity,
    now: DateTime<Utc>,
) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(entry) {
        return Ok(id);
    }
    Ok(vault.resolve_keyword(entry, viewer, now)?)
}

/// Error message when the store file is missing.
pub fn missing_store_message(path: &Path) -> String {
    format!(
        "No vault store found at {}\n\nRun:\n  pinvault init\n\nOr specify a store path:\n  PINVAULT_STORE=/path/to/vault.db pinvault init",
        path.display()
    )
}

/// Error message when config file is missing.
pub fn missing_config_message(config_path: &Path) -> String {
    format!("No config found at {}", config_path.display())
}

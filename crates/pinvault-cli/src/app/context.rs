//! Application context for the PinVault CLI.
//!
//! Bundles the parsed arguments with the config file (when one exists) and
//! the UI settings, and knows how to open the vault they describe.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pinvault_core::notify::TracingNotifier;
use pinvault_core::{Identity, SqliteVaultStore, Vault, VaultError, VaultSettings};

use crate::cli::Cli;
use crate::config::{read_config, PinvaultConfig};
use crate::errors::CliError;
use crate::ui::UiContext;

use super::resolver::{
    missing_store_message, resolve_config_path, resolve_identity, resolve_store_path,
};

/// Everything a command handler needs besides its own arguments.
pub struct AppContext<'a> {
    cli: &'a Cli,
    config: Option<PinvaultConfig>,
    ui: UiContext,
}

impl<'a> AppContext<'a> {
    /// Create a context, reading the config file if there is one.
    pub fn new(cli: &'a Cli) -> anyhow::Result<Self> {
        let config_path = resolve_config_path()?;
        let config = if config_path.exists() {
            Some(read_config(&config_path)?)
        } else {
            None
        };
        Ok(Self {
            cli,
            config,
            ui: UiContext::from_env(cli.json, cli.no_color),
        })
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    pub fn ui(&self) -> &UiContext {
        &self.ui
    }

    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        resolve_store_path(self.cli, self.config.as_ref())
    }

    pub fn identity(&self) -> anyhow::Result<Identity> {
        resolve_identity(self.cli, self.config.as_ref())
    }

    pub fn settings(&self) -> anyhow::Result<VaultSettings> {
        match &self.config {
            Some(config) => config.challenge.settings(),
            None => Ok(VaultSettings::default()),
        }
    }

    /// Wall-clock time of this invocation.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn open_store(&self) -> anyhow::Result<Arc<SqliteVaultStore>> {
        let path = self.store_path()?;
        match SqliteVaultStore::open(&path) {
            Ok(store) => Ok(Arc::new(store)),
            Err(VaultError::NotFound(_)) => Err(CliError::not_found(
                missing_store_message(&path),
                "Hint: Check --store or the [store] path in your config.",
            )
            .into()),
            Err(err) => Err(err.into()),
        }
    }

    /// Open the vault; purchases are read from the same store.
    pub fn open_vault(&self) -> anyhow::Result<(Vault, Arc<SqliteVaultStore>)> {
        let store = self.open_store()?;
        let vault = Vault::with_settings(
            store.clone(),
            store.clone(),
            Arc::new(TracingNotifier),
            self.settings()?,
        );
        Ok((vault, store))
    }
}

use std::path::{Path, PathBuf};

use chrono::Duration;
use chrono_tz::Tz;
use pinvault_core::{AttemptWindow, VaultSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinvaultConfig {
    pub store: StoreSection,
    pub identity: IdentitySection,
    #[serde(default)]
    pub challenge: ChallengeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySection {
    pub device_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSection {
    #[serde(default)]
    pub window: WindowKind,
    /// IANA timezone for `calendar_day` windows
    pub timezone: Option<String>,
    #[serde(default = "default_grace_period_hours")]
    pub grace_period_hours: u32,
}

impl Default for ChallengeSection {
    fn default() -> Self {
        Self {
            window: WindowKind::default(),
            timezone: None,
            grace_period_hours: default_grace_period_hours(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    #[default]
    Rolling,
    CalendarDay,
}

fn default_grace_period_hours() -> u32 {
    24
}

impl PinvaultConfig {
    pub fn new(store_path: PathBuf, device_token: String, challenge: ChallengeSection) -> Self {
        Self {
            store: StoreSection {
                path: store_path.to_string_lossy().to_string(),
            },
            identity: IdentitySection { device_token },
            challenge,
        }
    }
}

impl ChallengeSection {
    /// Vault settings described by this section.
    pub fn settings(&self) -> anyhow::Result<VaultSettings> {
        if self.grace_period_hours == 0 {
            return Err(anyhow::anyhow!("grace_period_hours must be at least 1"));
        }
        let window = match self.window {
            WindowKind::Rolling => AttemptWindow::Rolling,
            WindowKind::CalendarDay => {
                let name = self.timezone.as_deref().unwrap_or("UTC");
                let tz: Tz = name
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid timezone {}: {}", name, e))?;
                AttemptWindow::CalendarDay(tz)
            }
        };
        Ok(VaultSettings::new()
            .with_grace_period(Duration::hours(i64::from(self.grace_period_hours)))
            .with_window(window))
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_store_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("vault.db"))
}

pub fn read_config(path: &Path) -> anyhow::Result<PinvaultConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &PinvaultConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    pinvault_core::fs::write_atomic(path, contents.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("pinvault"));
        }
    }
    Ok(home_dir()?.join(".config").join("pinvault"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("pinvault"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("pinvault"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

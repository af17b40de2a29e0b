//! Owner and challenger identities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Maximum bytes for a device token or account id.
pub const MAX_IDENTITY_BYTES: usize = 128;

/// Who owns or challenges an entry.
///
/// Anonymous devices and signed-in accounts are distinct identities even
/// when their raw values coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Identity {
    /// Anonymous per-device token
    Device(String),
    /// Authenticated account id
    Account(String),
}

impl Identity {
    pub fn device(token: impl Into<String>) -> Self {
        Identity::Device(token.into())
    }

    pub fn account(id: impl Into<String>) -> Self {
        Identity::Account(id.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            Identity::Device(_) => "device",
            Identity::Account(_) => "account",
        }
    }

    fn value(&self) -> &str {
        match self {
            Identity::Device(value) | Identity::Account(value) => value,
        }
    }
}

/// Stored and displayed as `device:<token>` or `account:<id>`.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

impl FromStr for Identity {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s.split_once(':').ok_or_else(|| {
            VaultError::InvalidInput(format!(
                "Identity must look like device:<token> or account:<id>, got {:?}",
                s
            ))
        })?;
        if value.is_empty() {
            return Err(VaultError::InvalidInput("Identity value is empty".to_string()));
        }
        if value.len() > MAX_IDENTITY_BYTES {
            return Err(VaultError::InvalidInput(format!(
                "Identity too long (max {} bytes)",
                MAX_IDENTITY_BYTES
            )));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(VaultError::InvalidInput(
                "Identity contains whitespace".to_string(),
            ));
        }
        match kind {
            "device" => Ok(Identity::Device(value.to_string())),
            "account" => Ok(Identity::Account(value.to_string())),
            other => Err(VaultError::InvalidInput(format!(
                "Unknown identity kind: {}",
                other
            ))),
        }
    }
}

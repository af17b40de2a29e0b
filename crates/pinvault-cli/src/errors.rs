//! CLI error types for structured error handling.
//!
//! Errors raised by the CLI itself are [`CliError`]s; errors from the core
//! arrive as [`VaultError`]s inside an `anyhow::Error`. Both map to the exit
//! codes in [`crate::constants::exit_codes`].

use std::fmt;

use pinvault_core::VaultError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (config, store, entry)
    NotFound { message: String, hint: String },

    /// Invalid user input
    InvalidInput(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } => {
                write!(f, "{}\n{}", message, hint)
            }
            CliError::InvalidInput(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Create a NotFound error with message and hint.
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
        }
    }
}

/// Exit code for a core error.
pub fn vault_exit_code(err: &VaultError) -> i32 {
    match err {
        VaultError::NotFound(_) => exit_codes::NOT_FOUND,
        VaultError::InvalidGuessFormat { .. }
        | VaultError::Validation(_)
        | VaultError::InvalidInput(_) => exit_codes::INVALID_INPUT,
        VaultError::KeywordAlreadyExists(_)
        | VaultError::NotOwner(_)
        | VaultError::LengthNotIncreasing { .. }
        | VaultError::EntitlementMissing(_)
        | VaultError::TransferConflict(_)
        | VaultError::EntryUnavailable(_)
        | VaultError::SelfChallenge => exit_codes::REJECTED,
        VaultError::StoreUnavailable { .. } | VaultError::Storage(_) => exit_codes::STORE_FAILED,
        VaultError::Notify(_) => 1,
    }
}

/// Exit code for any error reaching `main`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(cli) = cause.downcast_ref::<CliError>() {
            return cli.exit_code();
        }
        if let Some(vault) = cause.downcast_ref::<VaultError>() {
            return vault_exit_code(vault);
        }
    }
    1
}

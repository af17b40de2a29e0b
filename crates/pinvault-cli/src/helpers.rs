//! Prompt helpers shared by command handlers.

use dialoguer::{Confirm, Password};

use crate::errors::CliError;
use crate::ui::UiContext;

/// Use the given passcode, or prompt for one on a terminal.
pub fn read_passcode(ui: &UiContext, provided: Option<String>, prompt: &str) -> anyhow::Result<String> {
    if let Some(passcode) = provided {
        return Ok(passcode);
    }
    if !ui.interactive {
        return Err(CliError::invalid_input(
            "--passcode is required when not running interactively",
        )
        .into());
    }
    let passcode = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Repeat passcode", "Passcodes do not match")
        .interact()?;
    Ok(passcode)
}

/// Ask for confirmation on a terminal; non-interactive runs proceed.
pub fn confirm(ui: &UiContext, prompt: &str) -> anyhow::Result<bool> {
    if !ui.interactive || ui.mode.is_json() {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

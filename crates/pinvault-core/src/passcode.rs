//! Numeric passcodes guarding vault entries.

use std::fmt;

use zeroize::Zeroize;

use crate::error::{Result, VaultError};

/// Shortest passcode length; every entry starts here (free tier).
pub const MIN_PASSCODE_LENGTH: u8 = 3;

/// Longest passcode length purchasable.
pub const MAX_PASSCODE_LENGTH: u8 = 10;

/// Reject lengths outside the supported tier range.
pub fn validate_length(length: u8) -> Result<()> {
    if !(MIN_PASSCODE_LENGTH..=MAX_PASSCODE_LENGTH).contains(&length) {
        return Err(VaultError::Validation(format!(
            "Passcode length must be between {} and {}",
            MIN_PASSCODE_LENGTH, MAX_PASSCODE_LENGTH
        )));
    }
    Ok(())
}

/// A zero-padded digit string.
///
/// `Debug` never prints the digits and the buffer is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Passcode(String);

impl Passcode {
    /// Parse a passcode, requiring digits only and a supported length.
    pub fn parse(digits: &str) -> Result<Self> {
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VaultError::Validation(
                "Passcode must contain only digits 0-9".to_string(),
            ));
        }
        let length = u8::try_from(digits.len())
            .map_err(|_| VaultError::Validation("Passcode too long".to_string()))?;
        validate_length(length)?;
        Ok(Self(digits.to_string()))
    }

    /// Parse a passcode that must match an entry's configured length.
    pub fn parse_with_length(digits: &str, length: u8) -> Result<Self> {
        let passcode = Self::parse(digits)?;
        if passcode.len() != length {
            return Err(VaultError::Validation(format!(
                "Passcode must be exactly {} digits",
                length
            )));
        }
        Ok(passcode)
    }

    /// The all-zero passcode a stolen entry falls back to.
    pub fn zeroed(length: u8) -> Result<Self> {
        validate_length(length)?;
        Ok(Self("0".repeat(usize::from(length))))
    }

    pub fn len(&self) -> u8 {
        // Construction bounds the length to MAX_PASSCODE_LENGTH.
        self.0.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zeroed(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Raw digits. Callers must not log or return these to non-owners.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passcode(<{} digits>)", self.0.len())
    }
}

impl Drop for Passcode {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

//! Guess evaluation.
//!
//! A guess is scored position by position against the secret passcode.
//! Exact matches are taken first so repeated digits are never counted twice:
//! for secret `112` and guess `211` only the middle position is exact and
//! the outer digits are partial matches, never three partials.
//!
//! ## Wire format
//!
//! Feedback crosses the boundary as one symbol per digit, in guess order:
//!
//! | Hint    | Symbol |
//! |---------|--------|
//! | Exact   | `◎`    |
//! | Partial | `○`    |
//! | Wrong   | `×`    |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Classification of a single guessed digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Hint {
    /// Right digit, right position
    Exact,
    /// Digit appears elsewhere in the secret
    Partial,
    /// Digit absent (or all its instances already matched)
    Wrong,
}

impl Hint {
    pub fn symbol(self) -> char {
        match self {
            Hint::Exact => '◎',
            Hint::Partial => '○',
            Hint::Wrong => '×',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '◎' => Some(Hint::Exact),
            '○' => Some(Hint::Partial),
            '×' => Some(Hint::Wrong),
            _ => None,
        }
    }
}

/// Positional feedback for one guess.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Feedback(Vec<Hint>);

impl Feedback {
    pub fn hints(&self) -> &[Hint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every position matched exactly.
    pub fn is_solved(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|hint| *hint == Hint::Exact)
    }

    pub fn count(&self, hint: Hint) -> usize {
        self.0.iter().filter(|h| **h == hint).count()
    }
}

impl From<Vec<Hint>> for Feedback {
    fn from(hints: Vec<Hint>) -> Self {
        Self(hints)
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hint in &self.0 {
            write!(f, "{}", hint.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Feedback {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        let hints = s
            .chars()
            .map(|c| {
                Hint::from_symbol(c).ok_or_else(|| {
                    VaultError::InvalidInput(format!("Unknown feedback symbol: {:?}", c))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if hints.is_empty() {
            return Err(VaultError::InvalidInput("Feedback is empty".to_string()));
        }
        Ok(Self(hints))
    }
}

impl Serialize for Feedback {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Check that a guess is shaped like a passcode of `expected` digits.
pub fn validate_guess(guess: &str, expected: usize) -> Result<()> {
    if guess.len() != expected || !guess.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::InvalidGuessFormat { expected });
    }
    Ok(())
}

/// Score `guess` against `secret`.
///
/// Both must be ASCII digit strings of equal length; anything else is
/// `InvalidGuessFormat`.
pub fn evaluate(secret: &str, guess: &str) -> Result<Feedback> {
    validate_guess(guess, secret.len())?;
    if !secret.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::Validation(
            "Stored passcode is not a digit string".to_string(),
        ));
    }

    let secret = secret.as_bytes();
    let guess = guess.as_bytes();
    let mut hints = vec![Hint::Wrong; secret.len()];
    // Unmatched secret digits, indexed by digit value.
    let mut remaining = [0u8; 10];

    for (i, (&s, &g)) in secret.iter().zip(guess).enumerate() {
        if s == g {
            hints[i] = Hint::Exact;
        } else {
            remaining[usize::from(s - b'0')] += 1;
        }
    }

    for (i, &g) in guess.iter().enumerate() {
        if hints[i] == Hint::Exact {
            continue;
        }
        let slot = &mut remaining[usize::from(g - b'0')];
        if *slot > 0 {
            *slot -= 1;
            hints[i] = Hint::Partial;
        }
    }

    Ok(Feedback(hints))
}

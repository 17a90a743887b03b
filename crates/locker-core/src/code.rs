//! Access code issuance
//!
//! Every scheme prefixes the code with the compartment id. A compartment is
//! referenced by at most one active ticket, so two active tickets can never
//! share a code regardless of the suffix.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::LockerError;
use crate::tier::CompartmentId;

/// Modulus applied to the timestamp in [`CodeScheme::Timestamped`] codes.
pub const TIMESTAMP_MODULUS: u64 = 10_000;

/// Redeemable code handed to the depositor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessCode(String);

impl AccessCode {
    /// Wrap an existing code string
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AccessCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How access codes are minted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeScheme {
    /// `<compartment>-<now_ms mod 10000>`; guessable, kept for parity with
    /// existing printed tickets
    #[default]
    Timestamped,
    /// `<compartment>-<random uuid>`
    Random,
}

impl CodeScheme {
    /// Mint a code for `compartment` at `now_ms`
    pub fn issue(self, compartment: CompartmentId, now_ms: u64) -> AccessCode {
        match self {
            CodeScheme::Timestamped => {
                AccessCode(format!("{compartment}-{}", now_ms % TIMESTAMP_MODULUS))
            }
            CodeScheme::Random => AccessCode(format!("{compartment}-{}", Uuid::new_v4().simple())),
        }
    }
}

impl FromStr for CodeScheme {
    type Err = LockerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamped" => Ok(CodeScheme::Timestamped),
            "random" => Ok(CodeScheme::Random),
            other => Err(LockerError::invalid_config(format!(
                "unknown code scheme '{other}'"
            ))),
        }
    }
}

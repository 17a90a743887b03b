//! Locker errors
//!
//! Caller-visible failures only. Broken invariants (double release, a code
//! issued twice while active) are programming errors and panic instead.

use crate::tier::SizeTier;

/// Result alias used across the engine.
pub type LockerResult<T> = Result<T, LockerError>;

/// Error type for locker operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockerError {
    /// No compartment of the requested tier or any larger tier is free.
    #[error("No locker available for size {requested}")]
    CapacityExhausted { requested: SizeTier },

    /// The code is unknown, already redeemed, or was swept after expiry.
    #[error("Invalid or expired code: {code}")]
    InvalidCode { code: String },

    /// Configuration failed to load or validate.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A compartment identifier did not match `<prefix>-<index>`.
    #[error("Invalid compartment id: {raw}")]
    InvalidCompartmentId { raw: String },

    /// A size tier name did not parse.
    #[error("Unknown size tier: {raw}")]
    InvalidTier { raw: String },
}

impl LockerError {
    /// Create a capacity exhausted error
    pub fn capacity_exhausted(requested: SizeTier) -> Self {
        Self::CapacityExhausted { requested }
    }

    /// Create an invalid code error
    pub fn invalid_code(code: impl Into<String>) -> Self {
        Self::InvalidCode { code: code.into() }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether retrying later may succeed.
    ///
    /// Capacity frees up as packages are picked up or swept; a bad code never
    /// becomes valid.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LockerError::capacity_exhausted(SizeTier::Large);
        assert_eq!(err.to_string(), "No locker available for size LARGE");

        let err = LockerError::invalid_code("S-0-1000");
        assert_eq!(err.to_string(), "Invalid or expired code: S-0-1000");
    }

    #[test]
    fn test_only_capacity_is_retryable() {
        assert!(LockerError::capacity_exhausted(SizeTier::Small).is_retryable());
        assert!(!LockerError::invalid_code("nope").is_retryable());
        assert!(!LockerError::invalid_config("zero retention").is_retryable());
    }
}

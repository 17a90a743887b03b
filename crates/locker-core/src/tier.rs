//! Size tiers and compartment identifiers
//!
//! Tiers are totally ordered; an upgrade only ever moves to a larger tier.
//! A [`CompartmentId`] carries its tier as a field. The `"S-3"` string form
//! exists for display and for parsing codes handed back by callers, never
//! for deciding which pool a compartment belongs to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::LockerError;

/// Compartment size class, ordered smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    /// Smallest compartments
    Small,
    /// Mid-size compartments
    Medium,
    /// Largest compartments
    Large,
}

impl SizeTier {
    /// All tiers in ascending order.
    pub const ALL: [SizeTier; 3] = [SizeTier::Small, SizeTier::Medium, SizeTier::Large];

    /// Position of this tier in [`SizeTier::ALL`].
    pub const fn rank(self) -> usize {
        match self {
            SizeTier::Small => 0,
            SizeTier::Medium => 1,
            SizeTier::Large => 2,
        }
    }

    /// Identifier prefix used in the display form of compartment ids.
    pub const fn prefix(self) -> &'static str {
        match self {
            SizeTier::Small => "S",
            SizeTier::Medium => "M",
            SizeTier::Large => "L",
        }
    }

    /// The requested tier followed by every larger tier, smallest first.
    pub fn upgrades(self) -> impl Iterator<Item = SizeTier> {
        SizeTier::ALL.into_iter().skip(self.rank())
    }

    fn from_prefix(prefix: &str) -> Option<SizeTier> {
        SizeTier::ALL.into_iter().find(|tier| tier.prefix() == prefix)
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeTier::Small => "SMALL",
            SizeTier::Medium => "MEDIUM",
            SizeTier::Large => "LARGE",
        };
        f.pad(name)
    }
}

impl FromStr for SizeTier {
    type Err = LockerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "s" => Ok(SizeTier::Small),
            "medium" | "m" => Ok(SizeTier::Medium),
            "large" | "l" => Ok(SizeTier::Large),
            _ => Err(LockerError::InvalidTier { raw: s.to_string() }),
        }
    }
}

/// Identifier of one physical compartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompartmentId {
    tier: SizeTier,
    index: u32,
}

impl CompartmentId {
    /// Create an identifier for compartment `index` of `tier`
    pub const fn new(tier: SizeTier, index: u32) -> Self {
        Self { tier, index }
    }

    /// Tier this compartment belongs to
    pub const fn tier(&self) -> SizeTier {
        self.tier
    }

    /// Index of this compartment within its tier
    pub const fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for CompartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.tier.prefix(), self.index)
    }
}

impl FromStr for CompartmentId {
    type Err = LockerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LockerError::InvalidCompartmentId { raw: s.to_string() };

        let (prefix, index) = s.split_once('-').ok_or_else(invalid)?;
        let tier = SizeTier::from_prefix(prefix).ok_or_else(invalid)?;
        let index = index.parse::<u32>().map_err(|_| invalid())?;
        Ok(CompartmentId::new(tier, index))
    }
}

impl Serialize for CompartmentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CompartmentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

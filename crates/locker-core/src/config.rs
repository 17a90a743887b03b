//! Locker configuration
//!
//! Defaults reproduce the reference installation: ten compartments per tier
//! and a three day retention window. Values can come from a TOML file and be
//! overridden by `LOCKER_*` environment variables.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::saturating_millis;
use crate::code::CodeScheme;
use crate::errors::{LockerError, LockerResult};
use crate::tier::SizeTier;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "LOCKER_";

/// Default retention window: three days.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Default number of compartments per tier.
pub const DEFAULT_COMPARTMENTS_PER_TIER: u32 = 10;

/// Number of compartments installed per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierCapacity {
    /// Small compartments
    pub small: u32,
    /// Medium compartments
    pub medium: u32,
    /// Large compartments
    pub large: u32,
}

impl TierCapacity {
    /// Same count for every tier
    pub const fn uniform(per_tier: u32) -> Self {
        Self {
            small: per_tier,
            medium: per_tier,
            large: per_tier,
        }
    }

    /// Compartment count for `tier`
    pub const fn for_tier(&self, tier: SizeTier) -> u32 {
        match tier {
            SizeTier::Small => self.small,
            SizeTier::Medium => self.medium,
            SizeTier::Large => self.large,
        }
    }

    /// Size of the whole compartment universe
    pub fn total(&self) -> u64 {
        SizeTier::ALL
            .iter()
            .map(|tier| u64::from(self.for_tier(*tier)))
            .sum()
    }

    fn set(&mut self, tier: SizeTier, count: u32) {
        match tier {
            SizeTier::Small => self.small = count,
            SizeTier::Medium => self.medium = count,
            SizeTier::Large => self.large = count,
        }
    }
}

impl Default for TierCapacity {
    fn default() -> Self {
        Self::uniform(DEFAULT_COMPARTMENTS_PER_TIER)
    }
}

/// Locker service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockerConfig {
    /// Compartments installed per tier
    pub capacity: TierCapacity,

    /// How long an unredeemed ticket stays valid, measured from deposit
    pub retention_ms: u64,

    /// How access codes are minted
    pub code_scheme: CodeScheme,

    /// Interval for the optional background sweep; `None` leaves sweeping to
    /// an external scheduler
    pub sweep_interval_ms: Option<u64>,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            capacity: TierCapacity::default(),
            retention_ms: saturating_millis(DEFAULT_RETENTION),
            code_scheme: CodeScheme::Timestamped,
            sweep_interval_ms: None,
        }
    }
}

impl LockerConfig {
    /// Configuration for tests: reference capacity and retention, no sweeper
    pub fn for_testing() -> Self {
        Self::default()
    }

    /// Override the per-tier capacity
    pub fn with_capacity(mut self, capacity: TierCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Override the retention window
    ///
    /// Windows longer than `u64::MAX` milliseconds clamp to `u64::MAX`.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention_ms = saturating_millis(retention);
        self
    }

    /// Override the access code scheme
    pub fn with_code_scheme(mut self, scheme: CodeScheme) -> Self {
        self.code_scheme = scheme;
        self
    }

    /// Retention window as a [`Duration`]
    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// Background sweep interval, if enabled
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_ms.map(Duration::from_millis)
    }

    /// Parse configuration from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> LockerResult<Self> {
        toml::from_str(content)
            .map_err(|e| LockerError::invalid_config(format!("Invalid TOML: {e}")))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> LockerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LockerError::invalid_config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `LOCKER_*` overrides from the process environment
    ///
    /// Variables outside the `LOCKER_` namespace are skipped even when they
    /// are not valid UTF-8. A `LOCKER_*` variable with a non-UTF-8 value is a
    /// configuration error.
    pub fn merge_with_env(&mut self) -> LockerResult<()> {
        let vars = utf8_locker_vars(std::env::vars_os())?;
        self.merge_env_vars(vars)
    }

    /// Apply `LOCKER_*` overrides from an explicit set of variables
    ///
    /// Unrecognised `LOCKER_*` keys are ignored.
    pub fn merge_env_vars<I, K, V>(&mut self, vars: I) -> LockerResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();

            match key {
                "RETENTION_MS" => self.retention_ms = parse_env(key, value)?,
                "SMALL" => self.capacity.set(SizeTier::Small, parse_env(key, value)?),
                "MEDIUM" => self.capacity.set(SizeTier::Medium, parse_env(key, value)?),
                "LARGE" => self.capacity.set(SizeTier::Large, parse_env(key, value)?),
                "CODE_SCHEME" => self.code_scheme = value.parse()?,
                "SWEEP_INTERVAL_MS" => {
                    self.sweep_interval_ms = if value.is_empty() || value == "off" {
                        None
                    } else {
                        Some(parse_env(key, value)?)
                    };
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> LockerResult<()> {
        if self.capacity.total() == 0 {
            return Err(LockerError::invalid_config(
                "at least one compartment must be installed",
            ));
        }
        if self.retention_ms == 0 {
            return Err(LockerError::invalid_config(
                "retention window must be positive",
            ));
        }
        if self.sweep_interval_ms == Some(0) {
            return Err(LockerError::invalid_config(
                "sweep interval must be positive when set",
            ));
        }
        Ok(())
    }
}

/// Keep the `LOCKER_*` variables, requiring their values to be UTF-8
fn utf8_locker_vars<I>(vars: I) -> LockerResult<Vec<(String, String)>>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut selected = Vec::new();
    for (key, value) in vars {
        let Some(key) = key.to_str().filter(|k| k.starts_with(ENV_PREFIX)) else {
            continue;
        };
        let value = value.into_string().map_err(|raw| {
            LockerError::invalid_config(format!("{key}: value is not valid UTF-8 ({raw:?})"))
        })?;
        selected.push((key.to_string(), value));
    }
    Ok(selected)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> LockerResult<T> {
    value.parse().map_err(|_| {
        LockerError::invalid_config(format!("{ENV_PREFIX}{key}: cannot parse '{value}'"))
    })
}

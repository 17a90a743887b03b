//! Locker-Core: In-Memory Compartment Allocation
//!
//! Assigns storage compartments of varying sizes to depositors, issues
//! redeemable access codes, and reclaims compartments on pickup or expiry.
//!
//! # Architecture Overview
//!
//! A single [`LockerService`] owns two structures behind one lock:
//! - **Free pools**: one FIFO queue per [`SizeTier`] of unoccupied compartments
//! - **Ticket index**: access code to [`Ticket`], the sole source of truth for
//!   whether a code is valid
//!
//! Control flow:
//! - `deposit`: pool acquire (upgrading to larger tiers if needed), ticket
//!   creation, index insert
//! - `pickup`: index remove, pool release
//! - `cleanup`: index scan, then remove + release for every expired ticket
//!
//! Time comes from an injected [`PhysicalClock`], so expiry is deterministic
//! under test with a [`ManualClock`].
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use locker_core::{LockerConfig, LockerService, ManualClock, SizeTier};
//!
//! let clock = Arc::new(ManualClock::new(1000));
//! let service = LockerService::new(LockerConfig::default(), clock.clone()).unwrap();
//!
//! let ticket = service.deposit(SizeTier::Large).unwrap();
//! clock.advance(Duration::from_secs(4 * 24 * 60 * 60));
//!
//! let report = service.cleanup();
//! assert_eq!(report.reclaimed, vec![ticket.compartment]);
//! assert!(service.pickup(ticket.code.as_str()).is_err());
//! ```

#![forbid(unsafe_code)]

/// Time source abstraction
pub mod clock;

/// Access code minting
pub mod code;

/// Configuration loading, overrides and validation
pub mod config;

/// Error types
pub mod errors;

/// Active ticket index
pub mod index;

/// Tiered free pools
pub mod pool;

/// The locker service
pub mod service;

/// Optional background cleanup
pub mod sweeper;

/// Size tiers and compartment identifiers
pub mod tier;

pub use clock::{ManualClock, PhysicalClock, SystemClock};
pub use code::{AccessCode, CodeScheme};
pub use config::{LockerConfig, TierCapacity};
pub use errors::{LockerError, LockerResult};
pub use index::Ticket;
pub use service::{Inventory, LockerService, LockerStatistics, PickupReceipt, SweepReport};
pub use sweeper::{spawn_configured_cleanup, spawn_periodic_cleanup, CleanupTask};
pub use tier::{CompartmentId, SizeTier};

//! Locker service
//!
//! Owns the free pools and the ticket index behind a single mutex. Deposit
//! (acquire + insert), pickup (remove + release) and cleanup (remove + release
//! for every expired ticket) each run inside one critical section, so no
//! observer can see a compartment that is both free and ticketed, or neither.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use locker_core::{LockerService, SizeTier, SystemClock};
//!
//! # fn example() -> Result<(), locker_core::LockerError> {
//! let service = LockerService::with_defaults(Arc::new(SystemClock))?;
//!
//! let ticket = service.deposit(SizeTier::Small)?;
//! let receipt = service.pickup(ticket.code.as_str())?;
//! assert_eq!(receipt.compartment, ticket.compartment);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` because:
//! 1. Every operation is O(tiers) or O(active tickets)
//! 2. The lock is never held across `.await` points
//! 3. No I/O happens inside the lock scope; log events fire after the
//!    guard is dropped

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::PhysicalClock;
use crate::config::{LockerConfig, TierCapacity};
use crate::errors::{LockerError, LockerResult};
use crate::index::{ReservationIndex, Ticket};
use crate::pool::FreePool;
use crate::tier::{CompartmentId, SizeTier};

// =============================================================================
// Results
// =============================================================================

/// Confirmation of a successful pickup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupReceipt {
    /// Compartment that was opened and is now free again
    pub compartment: CompartmentId,
    /// Pickup time, milliseconds
    pub picked_up_at_ms: u64,
}

impl fmt::Display for PickupReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locker {} opened. Package retrieved.", self.compartment)
    }
}

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Compartments reclaimed, oldest ticket first
    pub reclaimed: Vec<CompartmentId>,
    /// Tickets still active after the sweep
    pub remaining: usize,
}

impl SweepReport {
    /// Whether the sweep reclaimed nothing
    pub fn is_empty(&self) -> bool {
        self.reclaimed.is_empty()
    }
}

/// Service counters since construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockerStatistics {
    /// Successful deposits
    pub deposits: u64,
    /// Deposits served from a larger tier than requested
    pub upgraded_deposits: u64,
    /// Deposits refused for lack of capacity
    pub capacity_rejections: u64,
    /// Successful pickups
    pub pickups: u64,
    /// Pickups with an unknown, redeemed or expired code
    pub invalid_pickups: u64,
    /// Tickets reclaimed by cleanup
    pub expired_reclaims: u64,
}

/// Point-in-time view of every compartment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Free compartments per tier, in hand-out order (small, medium, large)
    pub free: Vec<Vec<CompartmentId>>,
    /// Compartments referenced by active tickets, sorted
    pub occupied: Vec<CompartmentId>,
}

impl Inventory {
    /// Check that free and occupied compartments exactly partition the
    /// installed universe
    ///
    /// Returns a description of the first violation found.
    pub fn check_universe(&self, capacity: &TierCapacity) -> Result<(), String> {
        let mut seen = BTreeSet::new();
        let all = self.free.iter().flatten().chain(self.occupied.iter());
        for id in all {
            if !seen.insert(*id) {
                return Err(format!("compartment {id} appears twice"));
            }
        }

        for (rank, ids) in self.free.iter().enumerate() {
            if let Some(stray) = ids.iter().find(|id| id.tier().rank() != rank) {
                return Err(format!("compartment {stray} queued in the wrong tier"));
            }
        }

        let expected: BTreeSet<_> = SizeTier::ALL
            .into_iter()
            .flat_map(|tier| (0..capacity.for_tier(tier)).map(move |i| CompartmentId::new(tier, i)))
            .collect();
        if seen != expected {
            let missing: Vec<_> = expected.difference(&seen).map(ToString::to_string).collect();
            let extra: Vec<_> = seen.difference(&expected).map(ToString::to_string).collect();
            return Err(format!("missing {missing:?}, unexpected {extra:?}"));
        }
        Ok(())
    }
}

// =============================================================================
// Locker Service
// =============================================================================

#[derive(Debug)]
struct LockerState {
    pool: FreePool,
    index: ReservationIndex,
    stats: LockerStatistics,
}

/// In-memory compartment allocator with ticket validation and expiry
pub struct LockerService {
    config: LockerConfig,
    clock: Arc<dyn PhysicalClock>,
    state: Mutex<LockerState>,
}

impl fmt::Debug for LockerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockerService")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LockerService {
    /// Create a service with every compartment free
    pub fn new(config: LockerConfig, clock: Arc<dyn PhysicalClock>) -> LockerResult<Self> {
        config.validate()?;

        let state = LockerState {
            pool: FreePool::with_capacity(&config.capacity),
            index: ReservationIndex::new(),
            stats: LockerStatistics::default(),
        };
        info!(
            small = config.capacity.small,
            medium = config.capacity.medium,
            large = config.capacity.large,
            retention_ms = config.retention_ms,
            "locker service initialized"
        );

        Ok(Self {
            config,
            clock,
            state: Mutex::new(state),
        })
    }

    /// Create a service with the reference configuration
    pub fn with_defaults(clock: Arc<dyn PhysicalClock>) -> LockerResult<Self> {
        Self::new(LockerConfig::default(), clock)
    }

    /// Active configuration
    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    /// Store a package of `requested` size
    ///
    /// Falls through to larger tiers when the requested one is full. Fails
    /// with [`LockerError::CapacityExhausted`] only when nothing of the
    /// requested size or larger is free.
    pub fn deposit(&self, requested: SizeTier) -> LockerResult<Ticket> {
        let mut state = self.state.lock();
        let now_ms = self.clock.now_ms();

        let Some(compartment) = state.pool.acquire(requested) else {
            state.stats.capacity_rejections += 1;
            drop(state);
            warn!(%requested, "no compartment available");
            return Err(LockerError::capacity_exhausted(requested));
        };

        let ticket = Ticket {
            compartment,
            code: self.config.code_scheme.issue(compartment, now_ms),
            created_at_ms: now_ms,
        };
        state.index.insert(ticket.clone());

        let upgraded = compartment.tier() != requested;
        state.stats.deposits += 1;
        if upgraded {
            state.stats.upgraded_deposits += 1;
        }
        drop(state);

        if upgraded {
            debug!(%requested, %compartment, "deposit upgraded to larger tier");
        } else {
            debug!(%compartment, "deposit accepted");
        }
        Ok(ticket)
    }

    /// Redeem `code` and free its compartment
    ///
    /// Unknown, already redeemed and expired codes are indistinguishable and
    /// all fail with [`LockerError::InvalidCode`].
    pub fn pickup(&self, code: &str) -> LockerResult<PickupReceipt> {
        let mut state = self.state.lock();

        let Some(ticket) = state.index.remove(code) else {
            state.stats.invalid_pickups += 1;
            drop(state);
            warn!(code, "pickup with invalid code");
            return Err(LockerError::invalid_code(code));
        };
        state.pool.release(ticket.compartment);
        state.stats.pickups += 1;
        let picked_up_at_ms = self.clock.now_ms();
        drop(state);

        debug!(compartment = %ticket.compartment, "package retrieved");
        Ok(PickupReceipt {
            compartment: ticket.compartment,
            picked_up_at_ms,
        })
    }

    /// Reclaim every ticket older than the configured retention window
    pub fn cleanup(&self) -> SweepReport {
        self.cleanup_with(self.config.retention(), self.clock.now_ms())
    }

    /// Reclaim every ticket at least `retention` old as of `now_ms`
    pub fn cleanup_with(&self, retention: Duration, now_ms: u64) -> SweepReport {
        let mut state = self.state.lock();

        let expired = state.index.drain_expired(now_ms, retention);
        for ticket in &expired {
            state.pool.release(ticket.compartment);
        }
        state.stats.expired_reclaims += expired.len() as u64;
        let remaining = state.index.len();
        drop(state);

        for ticket in &expired {
            info!(
                compartment = %ticket.compartment,
                age_ms = ticket.age_ms(now_ms),
                "expired package removed"
            );
        }
        let report = SweepReport {
            reclaimed: expired.iter().map(|t| t.compartment).collect(),
            remaining,
        };
        if !report.is_empty() {
            info!(
                reclaimed = report.reclaimed.len(),
                remaining = report.remaining,
                "cleanup sweep finished"
            );
        }
        report
    }

    /// Whether `code` currently opens a compartment
    pub fn is_valid(&self, code: &str) -> bool {
        self.state.lock().index.contains(code)
    }

    /// Free compartments in `tier`
    pub fn available(&self, tier: SizeTier) -> usize {
        self.state.lock().pool.available(tier)
    }

    /// Number of outstanding tickets
    pub fn active_count(&self) -> usize {
        self.state.lock().index.len()
    }

    /// Counters since construction
    pub fn statistics(&self) -> LockerStatistics {
        self.state.lock().stats.clone()
    }

    /// Consistent snapshot of free and occupied compartments
    pub fn inventory(&self) -> Inventory {
        let state = self.state.lock();
        let free = SizeTier::ALL
            .into_iter()
            .map(|tier| state.pool.free_ids(tier))
            .collect();
        let mut occupied: Vec<_> = state.index.tickets().map(|t| t.compartment).collect();
        occupied.sort();
        Inventory { free, occupied }
    }
}

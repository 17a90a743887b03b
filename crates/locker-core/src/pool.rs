//! Tiered free pools
//!
//! One FIFO queue of unoccupied compartments per tier. Allocation pops the
//! front of the requested tier and falls through to larger tiers when it is
//! empty; release pushes to the back, so the longest-idle compartment is
//! handed out first.
//!
//! The pool knows its fixed universe. Releasing a compartment that is already
//! free, or that was never installed, means the caller lost track of
//! ownership and panics.

use std::collections::{HashSet, VecDeque};

use crate::config::TierCapacity;
use crate::tier::{CompartmentId, SizeTier};

/// Free compartments, per tier
#[derive(Debug, Clone)]
pub struct FreePool {
    queues: [VecDeque<CompartmentId>; 3],
    free: HashSet<CompartmentId>,
    capacity: TierCapacity,
}

impl FreePool {
    /// Install `capacity` compartments, all initially free
    pub fn with_capacity(capacity: &TierCapacity) -> Self {
        let mut queues: [VecDeque<CompartmentId>; 3] = std::array::from_fn(|_| VecDeque::new());
        let mut free = HashSet::with_capacity(capacity.total() as usize);

        for tier in SizeTier::ALL {
            let queue = &mut queues[tier.rank()];
            for index in 0..capacity.for_tier(tier) {
                let id = CompartmentId::new(tier, index);
                queue.push_back(id);
                free.insert(id);
            }
        }

        Self {
            queues,
            free,
            capacity: *capacity,
        }
    }

    /// Take a compartment of `requested` size or, failing that, the smallest
    /// larger size that has one
    pub fn acquire(&mut self, requested: SizeTier) -> Option<CompartmentId> {
        let id = requested
            .upgrades()
            .find_map(|tier| self.queues[tier.rank()].pop_front())?;
        self.free.remove(&id);
        Some(id)
    }

    /// Return a compartment to the back of its tier's queue
    ///
    /// # Panics
    ///
    /// If `id` is already free or outside the installed universe.
    pub fn release(&mut self, id: CompartmentId) {
        assert!(
            self.is_installed(id),
            "released compartment {id} was never installed"
        );
        assert!(self.free.insert(id), "compartment {id} released twice");
        self.queues[id.tier().rank()].push_back(id);
    }

    /// Whether `id` belongs to the installed universe
    pub fn is_installed(&self, id: CompartmentId) -> bool {
        id.index() < self.capacity.for_tier(id.tier())
    }

    /// Whether `id` is currently free
    pub fn contains(&self, id: CompartmentId) -> bool {
        self.free.contains(&id)
    }

    /// Free compartments in `tier`
    pub fn available(&self, tier: SizeTier) -> usize {
        self.queues[tier.rank()].len()
    }

    /// Free compartments across all tiers
    pub fn total_available(&self) -> usize {
        self.free.len()
    }

    /// Free compartments in `tier`, in the order they will be handed out
    pub fn free_ids(&self, tier: SizeTier) -> Vec<CompartmentId> {
        self.queues[tier.rank()].iter().copied().collect()
    }
}

//! Physical clock capability
//!
//! The service never reads the system time directly; it asks the clock it was
//! constructed with. Production code passes [`SystemClock`], tests and the
//! demo pass a [`ManualClock`] they can move forward at will.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Source of wall-clock time in milliseconds.
pub trait PhysicalClock: Send + Sync {
    /// Current time in milliseconds since the UNIX epoch (or any fixed origin).
    fn now_ms(&self) -> u64;
}

impl<T: PhysicalClock + ?Sized> PhysicalClock for Arc<T> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Wall clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl PhysicalClock for SystemClock {
    fn now_ms(&self) -> u64 {
        saturating_millis(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default(),
        )
    }
}

/// Controllable clock for deterministic runs.
///
/// Time only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Jump to an absolute timestamp
    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    /// Move time forward by `by`, stopping at `u64::MAX`
    pub fn advance(&self, by: Duration) {
        let by_ms = saturating_millis(by);
        // The closure always returns `Some`, so the update cannot fail
        let _ = self
            .now_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(by_ms))
            });
    }
}

impl PhysicalClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

//! Generation counter for discarding results of superseded async work.
//!
//! An [`Epoch`] is captured when async work is started and compared with the
//! [`Generation`] when the work resolves. Advancing the generation makes
//! every previously captured epoch stale.

use std::sync::atomic::{AtomicU64, Ordering};

/// A captured generation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    /// The raw value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic generation counter.
#[derive(Debug, Default)]
pub struct Generation {
    current: AtomicU64,
}

impl Generation {
    /// Creates a counter at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current generation.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        Epoch(self.current.load(Ordering::SeqCst))
    }

    /// Moves to a new generation, invalidating all captured epochs.
    pub fn advance(&self) -> Epoch {
        Epoch(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns true if `epoch` was captured in the current generation.
    #[must_use]
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch() == epoch
    }
}

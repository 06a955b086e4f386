//! Atomic f64 storage
//!
//! The shared risk metrics carry monetary values that are read on the
//! order hot path and written by feeder threads. They are stored as the
//! IEEE-754 bit pattern inside an `AtomicU64`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` with atomic load/store semantics
#[derive(Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    /// Create a new atomic holding `value`
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    /// Load the current value
    #[must_use]
    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.bits.load(order))
    }

    /// Store a new value
    pub fn store(&self, value: f64, order: Ordering) {
        self.bits.store(value.to_bits(), order);
    }

    /// Add `delta` and return the previous value
    ///
    /// Implemented as a compare-exchange loop; the load uses `order` and
    /// the store uses release semantics so readers observe a consistent
    /// bit pattern.
    pub fn fetch_add(&self, delta: f64, order: Ordering) -> f64 {
        let mut current = self.bits.load(order);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return f64::from_bits(current),
                Err(observed) => current = observed,
            }
        }
    }
}

impl fmt::Debug for AtomicF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicF64")
            .field(&self.load(Ordering::Relaxed))
            .finish()
    }
}

//! Monotonic clock readable as an integer
//!
//! `Instant` cannot live in an atomic, so timestamps that need to be
//! shared lock-free (rate limiter refill marks, last-message times) are
//! expressed as nanoseconds since an arbitrary process epoch.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds elapsed since the process epoch (first call wins the epoch)
#[must_use]
pub fn monotonic_nanos() -> u64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

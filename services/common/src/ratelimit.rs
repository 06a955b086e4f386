//! Admission-control rate limiters
//!
//! Two schemes are provided. [`TokenBucket`] refills continuously and
//! admits bursts up to its capacity; it guards the hot ingress paths and
//! prefers throughput over fairness (starved callers retry externally).
//! [`SlidingWindowLimiter`] bounds the count of admissions inside a
//! rolling window and guards slow paths such as connection attempts.
//!
//! [`DistributedLimiter`] is the seam for cross-process limiting; only
//! the local token-bucket backend is supplied.

use crate::clock;
use crate::constants::time::{MILLIS_PER_SEC, NANOS_PER_MILLI};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Elapsed time below which a lock-free rejection skips the refill lock
const REFILL_SIGNIFICANCE_NS: u64 = 100 * NANOS_PER_MILLI;

/// Token bucket with continuous refill
///
/// The token count is readable without the lock so that exhausted
/// callers can be rejected on a single atomic load; refill-and-deduct is
/// serialized under a mutex. Under concurrent callers the total admitted
/// over any interval `D` never exceeds `max_tokens + refill_rate * D`.
pub struct TokenBucket {
    max_tokens: u32,
    refill_rate: u32,
    tokens: AtomicU32,
    last_refill_ns: AtomicU64,
    refill_lock: Mutex<()>,
}

impl TokenBucket {
    /// Create a bucket holding `max_tokens`, refilled at
    /// `refill_rate_per_second`
    #[must_use]
    pub fn new(max_tokens: u32, refill_rate_per_second: u32) -> Self {
        Self {
            max_tokens,
            refill_rate: refill_rate_per_second,
            tokens: AtomicU32::new(max_tokens),
            last_refill_ns: AtomicU64::new(clock::monotonic_nanos()),
            refill_lock: Mutex::new(()),
        }
    }

    /// Attempt to withdraw `tokens` tokens; true iff successful
    pub fn try_acquire(&self, tokens: u32) -> bool {
        let now = clock::monotonic_nanos();

        // Fast-path rejection without the lock
        if self.tokens.load(Ordering::Acquire) < tokens {
            self.refill_if_stale(now);
            if self.tokens.load(Ordering::Acquire) < tokens {
                return false;
            }
        }

        let _guard = self.refill_lock.lock();
        self.refill_locked(now);

        let current = self.tokens.load(Ordering::Relaxed);
        if current >= tokens {
            self.tokens.store(current - tokens, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Current token count, for monitoring
    #[must_use]
    pub fn available_tokens(&self) -> u32 {
        self.tokens.load(Ordering::Acquire)
    }

    /// Return the bucket to full and restart the refill clock
    pub fn reset(&self) {
        let _guard = self.refill_lock.lock();
        self.tokens.store(self.max_tokens, Ordering::Release);
        self.last_refill_ns
            .store(clock::monotonic_nanos(), Ordering::Release);
    }

    fn refill_if_stale(&self, now: u64) {
        let last = self.last_refill_ns.load(Ordering::Acquire);
        if now.saturating_sub(last) > REFILL_SIGNIFICANCE_NS {
            let _guard = self.refill_lock.lock();
            self.refill_locked(now);
        }
    }

    fn refill_locked(&self, now: u64) {
        let last = self.last_refill_ns.load(Ordering::Relaxed);
        let elapsed_ms = now.saturating_sub(last) / NANOS_PER_MILLI;
        if elapsed_ms == 0 {
            return;
        }

        // Floor division; the refill mark only advances when whole tokens
        // are credited so fractional progress is never discarded.
        let to_add = (elapsed_ms * u64::from(self.refill_rate)) / MILLIS_PER_SEC;
        if to_add > 0 {
            let current = self.tokens.load(Ordering::Relaxed);
            let credited = u32::try_from(to_add).unwrap_or(u32::MAX);
            let replenished = current.saturating_add(credited).min(self.max_tokens);
            self.tokens.store(replenished, Ordering::Relaxed);
            self.last_refill_ns.store(now, Ordering::Relaxed);
        }
    }
}

struct WindowState {
    slots: Box<[u64]>,
    oldest: u64,
    newest: u64,
}

/// Bounded count of admissions over a rolling window
///
/// A circular buffer of admission timestamps indexed by monotonically
/// increasing `oldest`/`newest` counters; `newest - oldest` is the live
/// count. Eviction walks only aged entries, so `try_acquire` is O(1)
/// amortized.
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting at most `max_requests` per `window`
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(WindowState {
                slots: vec![0; max_requests as usize].into_boxed_slice(),
                oldest: 0,
                newest: 0,
            }),
        }
    }

    /// Attempt one admission; true iff under the window bound
    pub fn try_acquire(&self) -> bool {
        if self.max_requests == 0 {
            return false;
        }
        let now = clock::monotonic_nanos();
        let cutoff = now.saturating_sub(u64::try_from(self.window.as_nanos()).unwrap_or(u64::MAX));
        let capacity = u64::from(self.max_requests);

        let mut state = self.state.lock();

        // Evict entries that fell out of the window
        while state.oldest < state.newest {
            let idx = (state.oldest % capacity) as usize;
            if state.slots[idx] >= cutoff {
                break;
            }
            state.oldest += 1;
        }

        if state.newest - state.oldest >= capacity {
            return false;
        }

        let idx = (state.newest % capacity) as usize;
        state.slots[idx] = now;
        state.newest += 1;
        true
    }

    /// Admissions currently inside the window (as of the last acquire)
    #[must_use]
    pub fn current_count(&self) -> u32 {
        let state = self.state.lock();
        u32::try_from(state.newest - state.oldest).unwrap_or(u32::MAX)
    }

    /// Forget all recorded admissions
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.oldest = 0;
        state.newest = 0;
    }
}

/// Backend seam for cross-process rate limiting
pub trait LimiterBackend: Send + Sync {
    /// Attempt to withdraw `tokens` for `key`; true iff admitted
    fn try_acquire(&self, key: &str, tokens: u32) -> bool;
}

/// Local backend: a plain token bucket, ignoring the key
struct LocalBackend {
    bucket: TokenBucket,
}

impl LimiterBackend for LocalBackend {
    fn try_acquire(&self, _key: &str, tokens: u32) -> bool {
        self.bucket.try_acquire(tokens)
    }
}

/// Keyed limiter with a pluggable backend
///
/// The intended deployment shares the key across processes; no shared
/// backend is implemented here, so the default delegates to a local
/// [`TokenBucket`] with the same parameters.
pub struct DistributedLimiter {
    key: String,
    backend: Arc<dyn LimiterBackend>,
}

impl DistributedLimiter {
    /// Create a limiter for `key` backed by a local token bucket
    #[must_use]
    pub fn new(key: impl Into<String>, max_tokens: u32, refill_rate_per_second: u32) -> Self {
        Self {
            key: key.into(),
            backend: Arc::new(LocalBackend {
                bucket: TokenBucket::new(max_tokens, refill_rate_per_second),
            }),
        }
    }

    /// Create a limiter for `key` with an explicit backend
    #[must_use]
    pub fn with_backend(key: impl Into<String>, backend: Arc<dyn LimiterBackend>) -> Self {
        Self {
            key: key.into(),
            backend,
        }
    }

    /// Attempt to withdraw `tokens`; true iff admitted
    pub fn try_acquire(&self, tokens: u32) -> bool {
        self.backend.try_acquire(&self.key, tokens)
    }

    /// The shared key this limiter contends on
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

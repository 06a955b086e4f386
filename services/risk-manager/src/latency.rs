//! Decision-latency tracking
//!
//! The gate records its elapsed wall time through [`LatencyRecorder`];
//! the histogram-backed implementation feeds the monitoring reports.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::time::Duration;

/// Sink for gate decision latencies
pub trait LatencyRecorder: Send + Sync {
    /// Record one decision's elapsed wall time
    fn record(&self, elapsed: Duration);
}

/// Snapshot of recorded latencies, microseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: f64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Histogram-backed latency tracker
pub struct HdrLatencyTracker {
    histogram: Mutex<Histogram<u64>>,
}

impl HdrLatencyTracker {
    /// Track values from 1 µs to 10 minutes at two significant figures
    #[must_use]
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, 600_000_000, 2)
            .expect("static histogram bounds are valid");
        Self {
            histogram: Mutex::new(histogram),
        }
    }

    /// Current stats snapshot
    #[must_use]
    pub fn stats(&self) -> LatencyStats {
        let histogram = self.histogram.lock();
        LatencyStats {
            count: histogram.len(),
            mean_us: histogram.mean(),
            p95_us: histogram.value_at_quantile(0.95),
            p99_us: histogram.value_at_quantile(0.99),
            max_us: histogram.max(),
        }
    }
}

impl Default for HdrLatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyRecorder for HdrLatencyTracker {
    fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX).max(1);
        self.histogram.lock().saturating_record(micros);
    }
}

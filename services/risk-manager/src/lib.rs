//! Pre-trade risk management
//!
//! A synchronous admission gate over shared, atomically updated metrics:
//! - Order value, daily loss, order rate, and portfolio limits
//! - Latched trading disable and emergency stop
//! - Background monitoring loop with escalation and periodic reports

pub mod config;
pub mod latency;
pub mod monitor;

use crate::latency::{HdrLatencyTracker, LatencyRecorder};
use serde::{Deserialize, Serialize};
use services_common::{AtomicF64, Side};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Static risk limits, immutable after init
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Maximum value of a single position, INR
    pub max_position_value: f64,
    /// Maximum total portfolio value, INR
    pub max_portfolio_value: f64,
    /// Maximum tolerated daily loss, INR (positive number)
    pub max_daily_loss: f64,
    /// Maximum value of a single order, INR
    pub max_order_value: f64,
    /// Maximum fraction of the portfolio in one position
    pub position_concentration: f64,
    /// Maximum fraction of the portfolio in one sector
    pub sector_concentration: f64,
    /// Maximum orders per second
    pub max_order_rate: u32,
    /// Maximum market-data messages per second
    pub max_message_rate: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_value: 10_000_000.0,
            max_portfolio_value: 50_000_000.0,
            max_daily_loss: 1_000_000.0,
            max_order_value: 5_000_000.0,
            position_concentration: 0.20,
            sector_concentration: 0.40,
            max_order_rate: 1_000,
            max_message_rate: 10_000,
        }
    }
}

/// Shared risk metrics; every field is atomic
///
/// Mutated by the gate (counts, flags), the monitoring loop (rate
/// decay, emergency latch), and external position/P&L feeders. There is
/// deliberately no cross-field locking; see [`RiskEngine::check_order`].
#[derive(Debug)]
pub struct RiskMetrics {
    pub current_portfolio_value: AtomicF64,
    pub daily_pnl: AtomicF64,
    pub daily_realized_pnl: AtomicF64,
    pub daily_unrealized_pnl: AtomicF64,
    pub daily_trades: AtomicU64,
    pub daily_orders: AtomicU64,
    pub rejected_orders: AtomicU64,
    pub current_order_rate: AtomicU32,
    pub current_message_rate: AtomicU32,
    pub active_positions: AtomicU32,
    pub trading_enabled: AtomicBool,
    pub emergency_stop: AtomicBool,
}

impl RiskMetrics {
    /// Session-start state: all counters zero, trading enabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_portfolio_value: AtomicF64::new(0.0),
            daily_pnl: AtomicF64::new(0.0),
            daily_realized_pnl: AtomicF64::new(0.0),
            daily_unrealized_pnl: AtomicF64::new(0.0),
            daily_trades: AtomicU64::new(0),
            daily_orders: AtomicU64::new(0),
            rejected_orders: AtomicU64::new(0),
            current_order_rate: AtomicU32::new(0),
            current_message_rate: AtomicU32::new(0),
            active_positions: AtomicU32::new(0),
            trading_enabled: AtomicBool::new(true),
            emergency_stop: AtomicBool::new(false),
        }
    }
}

impl Default for RiskMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous pre-trade gate
///
/// `check_order` is the latency-critical surface: five short-circuiting
/// predicates over atomic reads, one idempotent release-store when the
/// loss limit latches. Predicates do not observe a transactional
/// snapshot; racy boundary admissions are tolerated because the
/// monitoring loop re-checks and escalates.
pub struct RiskEngine {
    limits: RiskLimits,
    metrics: Arc<RiskMetrics>,
    latency: Arc<dyn LatencyRecorder>,
}

impl RiskEngine {
    /// Create an engine with its own latency tracker
    #[must_use]
    pub fn new(limits: RiskLimits) -> Self {
        Self::with_latency_recorder(limits, Arc::new(HdrLatencyTracker::new()))
    }

    /// Create an engine recording decision latency into `recorder`
    #[must_use]
    pub fn with_latency_recorder(limits: RiskLimits, recorder: Arc<dyn LatencyRecorder>) -> Self {
        Self {
            limits,
            metrics: Arc::new(RiskMetrics::new()),
            latency: recorder,
        }
    }

    /// Shared metrics handle
    #[must_use]
    pub fn metrics(&self) -> Arc<RiskMetrics> {
        Arc::clone(&self.metrics)
    }

    /// The static limits
    #[must_use]
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Admit or reject one candidate order
    pub fn check_order(&self, symbol: &str, side: Side, price: f64, quantity: u64) -> bool {
        let started = Instant::now();

        // Quantity fits f64 exactly up to 2^53; order values beyond that
        // fail the value limit anyway.
        let order_value = price * quantity as f64;
        let mut rejection: Option<&'static str> = None;

        if !self.metrics.trading_enabled.load(Ordering::Acquire)
            || self.metrics.emergency_stop.load(Ordering::Acquire)
        {
            rejection = Some("Trading disabled");
        }

        if rejection.is_none() && order_value > self.limits.max_order_value {
            rejection = Some("Order value exceeds limit");
        }

        if rejection.is_none()
            && self.metrics.daily_pnl.load(Ordering::Acquire) < -self.limits.max_daily_loss
        {
            rejection = Some("Daily loss limit breached");
            // Idempotent latch; double-clears are harmless
            self.metrics.trading_enabled.store(false, Ordering::Release);
        }

        if rejection.is_none()
            && self.metrics.current_order_rate.load(Ordering::Acquire) >= self.limits.max_order_rate
        {
            rejection = Some("Order rate limit exceeded");
        }

        if rejection.is_none() {
            let signed_value = match side {
                Side::Buy => order_value,
                Side::Sell => -order_value,
            };
            let projected =
                self.metrics.current_portfolio_value.load(Ordering::Acquire) + signed_value;
            if projected > self.limits.max_portfolio_value {
                rejection = Some("Portfolio value limit exceeded");
            }
        }

        let approved = match rejection {
            Some(reason) => {
                self.metrics.rejected_orders.fetch_add(1, Ordering::AcqRel);
                warn!(symbol, side = %side, order_value, reason, "order rejected");
                false
            }
            None => {
                self.metrics.daily_orders.fetch_add(1, Ordering::AcqRel);
                self.metrics.current_order_rate.fetch_add(1, Ordering::AcqRel);
                true
            }
        };

        self.latency.record(started.elapsed());
        approved
    }

    /// Push the marked portfolio value from the position feed
    pub fn update_position(&self, symbol: &str, position_value: f64) {
        self.metrics
            .current_portfolio_value
            .store(position_value, Ordering::Release);
        debug!(symbol, position_value, "position updated");
    }

    /// Push realized/unrealized P&L from the P&L feed
    pub fn update_pnl(&self, realized: f64, unrealized: f64) {
        self.metrics
            .daily_realized_pnl
            .store(realized, Ordering::Release);
        self.metrics
            .daily_unrealized_pnl
            .store(unrealized, Ordering::Release);
        self.metrics
            .daily_pnl
            .store(realized + unrealized, Ordering::Release);
    }

    /// Count one executed trade from the market-data consumer
    pub fn record_trade(&self) {
        self.metrics.daily_trades.fetch_add(1, Ordering::AcqRel);
    }

    /// Count market-data messages toward the current-rate window
    pub fn record_market_messages(&self, count: u32) {
        self.metrics
            .current_message_rate
            .fetch_add(count, Ordering::AcqRel);
    }

    /// Explicitly clear the trading-disable and emergency latches
    pub fn resume_trading(&self) {
        self.metrics.emergency_stop.store(false, Ordering::Release);
        self.metrics.trading_enabled.store(true, Ordering::Release);
        info!("trading resumed");
    }

    /// End-of-session reset of all daily counters and P&L
    pub fn reset_daily(&self) {
        self.metrics.daily_pnl.store(0.0, Ordering::Release);
        self.metrics.daily_realized_pnl.store(0.0, Ordering::Release);
        self.metrics
            .daily_unrealized_pnl
            .store(0.0, Ordering::Release);
        self.metrics.daily_trades.store(0, Ordering::Release);
        self.metrics.daily_orders.store(0, Ordering::Release);
        self.metrics.rejected_orders.store(0, Ordering::Release);
        self.metrics.current_order_rate.store(0, Ordering::Release);
        self.metrics.current_message_rate.store(0, Ordering::Release);
        info!("daily risk metrics reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_within_limits_is_approved() {
        let engine = RiskEngine::new(RiskLimits::default());
        assert!(engine.check_order("RELIANCE", Side::Buy, 100.0, 100));
        assert_eq!(engine.metrics().daily_orders.load(Ordering::Acquire), 1);
        assert_eq!(engine.metrics().current_order_rate.load(Ordering::Acquire), 1);
    }

    #[test]
    fn rejection_increments_counter_not_orders() {
        let engine = RiskEngine::new(RiskLimits {
            max_order_value: 1_000.0,
            ..RiskLimits::default()
        });
        assert!(!engine.check_order("RELIANCE", Side::Buy, 100.0, 100));
        assert_eq!(engine.metrics().rejected_orders.load(Ordering::Acquire), 1);
        assert_eq!(engine.metrics().daily_orders.load(Ordering::Acquire), 0);
    }
}

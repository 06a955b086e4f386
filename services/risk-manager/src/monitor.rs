//! Continuous risk monitoring
//!
//! A dedicated worker wakes every 100 ms: it decays the per-second rate
//! counters, escalates as the daily-loss and order-rate limits approach,
//! latches the emergency stop on a breach, and emits a periodic report.
//! The once-per-second counter zeroing is a coarse decay, kept as a
//! known approximation of a true sliding rate.

use crate::config::AlertThresholds;
use crate::latency::HdrLatencyTracker;
use crate::{RiskLimits, RiskMetrics};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const TICK: Duration = Duration::from_millis(100);
const RATE_RESET_INTERVAL: Duration = Duration::from_secs(1);
const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Escalation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
    Emergency,
}

/// One escalation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: i64,
    pub source: String,
}

impl RiskAlert {
    fn new(level: AlertLevel, source: &str, message: String) -> Self {
        Self {
            level,
            message,
            timestamp: chrono::Utc::now().timestamp_millis(),
            source: source.to_string(),
        }
    }
}

/// Background monitor over the shared risk metrics
pub struct RiskMonitor {
    metrics: Arc<RiskMetrics>,
    limits: RiskLimits,
    thresholds: AlertThresholds,
    latency: Arc<HdrLatencyTracker>,
    shutdown: Arc<AtomicBool>,
    loss_level: Option<AlertLevel>,
    rate_level: Option<AlertLevel>,
}

impl RiskMonitor {
    /// Create a monitor; `shutdown` is the process-wide stop flag
    #[must_use]
    pub fn new(
        metrics: Arc<RiskMetrics>,
        limits: RiskLimits,
        thresholds: AlertThresholds,
        latency: Arc<HdrLatencyTracker>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            metrics,
            limits,
            thresholds,
            latency,
            shutdown,
            loss_level: None,
            rate_level: None,
        }
    }

    /// Start the monitoring thread
    pub fn spawn(self) -> std::io::Result<RiskMonitorHandle> {
        let shutdown = Arc::clone(&self.shutdown);
        let metrics = Arc::clone(&self.metrics);
        let latency = Arc::clone(&self.latency);
        let worker = std::thread::Builder::new()
            .name("risk-monitor".to_string())
            .spawn(move || self.run())?;
        Ok(RiskMonitorHandle {
            shutdown,
            metrics,
            latency,
            worker: Some(worker),
        })
    }

    fn run(mut self) {
        info!("risk monitoring thread started");

        let mut last_rate_reset = Instant::now();
        let mut last_report = Instant::now();

        while !self.shutdown.load(Ordering::Acquire) {
            self.check_thresholds();
            self.check_emergency();

            if last_rate_reset.elapsed() >= RATE_RESET_INTERVAL {
                self.metrics.current_order_rate.store(0, Ordering::Release);
                self.metrics.current_message_rate.store(0, Ordering::Release);
                last_rate_reset = Instant::now();
            }

            if last_report.elapsed() >= REPORT_INTERVAL {
                self.report();
                last_report = Instant::now();
            }

            std::thread::sleep(TICK);
        }

        info!("risk monitoring thread stopped");
    }

    /// Severity of the current daily loss, if any
    fn loss_severity(&self, daily_pnl: f64) -> Option<AlertLevel> {
        let limit = self.limits.max_daily_loss;
        if daily_pnl < -limit * self.thresholds.critical_fraction {
            Some(AlertLevel::Critical)
        } else if daily_pnl < -limit * self.thresholds.warn_fraction {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }

    /// Severity of the current order rate, if any
    fn rate_severity(&self, order_rate: u32) -> Option<AlertLevel> {
        let limit = f64::from(self.limits.max_order_rate);
        let rate = f64::from(order_rate);
        if rate >= limit * self.thresholds.critical_fraction {
            Some(AlertLevel::Critical)
        } else if rate >= limit * self.thresholds.warn_fraction {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }

    fn check_thresholds(&mut self) {
        let daily_pnl = self.metrics.daily_pnl.load(Ordering::Acquire);
        let loss_now = self.loss_severity(daily_pnl);
        if loss_now != self.loss_level {
            if let Some(level) = loss_now {
                let used_pct = 100.0 * -daily_pnl / self.limits.max_daily_loss;
                let alert = RiskAlert::new(
                    level,
                    "daily-loss",
                    format!("daily loss {daily_pnl:.2} INR at {used_pct:.1}% of limit"),
                );
                warn!(level = ?alert.level, message = %alert.message, "risk threshold");
            }
            self.loss_level = loss_now;
        }

        let order_rate = self.metrics.current_order_rate.load(Ordering::Acquire);
        let rate_now = self.rate_severity(order_rate);
        if rate_now != self.rate_level {
            if let Some(level) = rate_now {
                let alert = RiskAlert::new(
                    level,
                    "order-rate",
                    format!(
                        "order rate {order_rate}/s approaching limit {}/s",
                        self.limits.max_order_rate
                    ),
                );
                warn!(level = ?alert.level, message = %alert.message, "risk threshold");
            }
            self.rate_level = rate_now;
        }
    }

    fn check_emergency(&self) {
        let daily_pnl = self.metrics.daily_pnl.load(Ordering::Acquire);
        if daily_pnl < -self.limits.max_daily_loss {
            self.metrics.trading_enabled.store(false, Ordering::Release);
            if !self.metrics.emergency_stop.swap(true, Ordering::AcqRel) {
                let alert = RiskAlert::new(
                    AlertLevel::Emergency,
                    "daily-loss",
                    format!(
                        "daily loss {daily_pnl:.2} INR breached limit {:.2} INR",
                        self.limits.max_daily_loss
                    ),
                );
                error!(message = %alert.message, "EMERGENCY STOP: trading disabled");
            }
        }
    }

    fn report(&self) {
        let latency = self.latency.stats();
        info!(
            portfolio_value = self.metrics.current_portfolio_value.load(Ordering::Acquire),
            realized_pnl = self.metrics.daily_realized_pnl.load(Ordering::Acquire),
            unrealized_pnl = self.metrics.daily_unrealized_pnl.load(Ordering::Acquire),
            daily_pnl = self.metrics.daily_pnl.load(Ordering::Acquire),
            daily_trades = self.metrics.daily_trades.load(Ordering::Acquire),
            daily_orders = self.metrics.daily_orders.load(Ordering::Acquire),
            rejected_orders = self.metrics.rejected_orders.load(Ordering::Acquire),
            order_rate = self.metrics.current_order_rate.load(Ordering::Acquire),
            message_rate = self.metrics.current_message_rate.load(Ordering::Acquire),
            active_positions = self.metrics.active_positions.load(Ordering::Acquire),
            trading_enabled = self.metrics.trading_enabled.load(Ordering::Acquire),
            emergency_stop = self.metrics.emergency_stop.load(Ordering::Acquire),
            latency_checks = latency.count,
            latency_mean_us = latency.mean_us,
            latency_p99_us = latency.p99_us,
            "risk monitor report"
        );
    }
}

/// Running monitor; stop to join and emit the final report
pub struct RiskMonitorHandle {
    shutdown: Arc<AtomicBool>,
    metrics: Arc<RiskMetrics>,
    latency: Arc<HdrLatencyTracker>,
    worker: Option<JoinHandle<()>>,
}

impl RiskMonitorHandle {
    /// Signal shutdown, join the worker, and emit the final report
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        let orders = self.metrics.daily_orders.load(Ordering::Acquire);
        let rejected = self.metrics.rejected_orders.load(Ordering::Acquire);
        let rejection_pct = if orders + rejected > 0 {
            100.0 * rejected as f64 / (orders + rejected) as f64
        } else {
            0.0
        };
        let latency = self.latency.stats();

        info!(
            daily_pnl = self.metrics.daily_pnl.load(Ordering::Acquire),
            daily_orders = orders,
            rejected_orders = rejected,
            rejection_pct,
            latency_checks = latency.count,
            latency_mean_us = latency.mean_us,
            latency_p95_us = latency.p95_us,
            latency_p99_us = latency.p99_us,
            latency_max_us = latency.max_us,
            "final risk monitor report"
        );
    }
}

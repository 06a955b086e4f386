//! Pre-trade gate scenarios

use risk_manager::config::AlertThresholds;
use risk_manager::latency::{HdrLatencyTracker, LatencyRecorder};
use risk_manager::monitor::RiskMonitor;
use risk_manager::{RiskEngine, RiskLimits};
use services_common::Side;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

fn engine_with(limits: RiskLimits) -> RiskEngine {
    RiskEngine::new(limits)
}

#[test]
fn approves_order_within_all_limits() {
    let engine = engine_with(RiskLimits::default());
    assert!(engine.check_order("RELIANCE", Side::Buy, 2_500.0, 100));

    let metrics = engine.metrics();
    assert_eq!(metrics.daily_orders.load(Ordering::Acquire), 1);
    assert_eq!(metrics.rejected_orders.load(Ordering::Acquire), 0);
}

#[test]
fn order_value_limit_rejects() {
    let engine = engine_with(RiskLimits {
        max_order_value: 1_000_000.0,
        ..RiskLimits::default()
    });

    // 10_001 * 100 = 1_000_100 > 1_000_000
    assert!(!engine.check_order("RELIANCE", Side::Buy, 100.0, 10_001));
    // Exactly at the limit passes
    assert!(engine.check_order("RELIANCE", Side::Buy, 100.0, 10_000));

    let metrics = engine.metrics();
    assert_eq!(metrics.rejected_orders.load(Ordering::Acquire), 1);
    assert_eq!(metrics.daily_orders.load(Ordering::Acquire), 1);
}

#[test]
fn daily_loss_breach_rejects_and_latches() {
    let engine = engine_with(RiskLimits {
        max_order_value: 1_000_000.0,
        max_daily_loss: 1_000_000.0,
        ..RiskLimits::default()
    });

    engine.update_pnl(-1_000_001.0, 0.0);

    // First check trips the latch
    assert!(!engine.check_order("TCS", Side::Buy, 100.0, 10));
    assert!(!engine.metrics().trading_enabled.load(Ordering::Acquire));

    // Every subsequent check fails on the disabled flag, including when
    // the loss recovers, until explicit reset
    engine.update_pnl(0.0, 0.0);
    assert!(!engine.check_order("TCS", Side::Buy, 100.0, 10));

    engine.resume_trading();
    assert!(engine.check_order("TCS", Side::Buy, 100.0, 10));
}

#[test]
fn gate_rejects_whenever_trading_disabled_or_emergency() {
    let engine = engine_with(RiskLimits::default());
    let metrics = engine.metrics();

    metrics.trading_enabled.store(false, Ordering::Release);
    assert!(!engine.check_order("RELIANCE", Side::Buy, 1.0, 1));

    metrics.trading_enabled.store(true, Ordering::Release);
    metrics.emergency_stop.store(true, Ordering::Release);
    assert!(!engine.check_order("RELIANCE", Side::Sell, 1.0, 1));

    metrics.emergency_stop.store(false, Ordering::Release);
    assert!(engine.check_order("RELIANCE", Side::Buy, 1.0, 1));
}

#[test]
fn order_rate_limit_rejects() {
    let engine = engine_with(RiskLimits {
        max_order_rate: 3,
        ..RiskLimits::default()
    });

    for _ in 0..3 {
        assert!(engine.check_order("RELIANCE", Side::Buy, 10.0, 1));
    }
    assert!(!engine.check_order("RELIANCE", Side::Buy, 10.0, 1));
    assert_eq!(engine.metrics().rejected_orders.load(Ordering::Acquire), 1);

    // The monitor's decay re-opens the gate
    engine.metrics().current_order_rate.store(0, Ordering::Release);
    assert!(engine.check_order("RELIANCE", Side::Buy, 10.0, 1));
}

#[test]
fn portfolio_projection_is_signed_by_side() {
    let engine = engine_with(RiskLimits {
        max_portfolio_value: 1_000_000.0,
        max_order_value: 5_000_000.0,
        ..RiskLimits::default()
    });
    engine.update_position("PORTFOLIO", 900_000.0);

    // A buy pushing past the cap is rejected
    assert!(!engine.check_order("RELIANCE", Side::Buy, 200_000.0, 1));
    // The same value sold projects downward and passes
    assert!(engine.check_order("RELIANCE", Side::Sell, 200_000.0, 1));
}

#[test]
fn pnl_feed_updates_all_components() {
    let engine = engine_with(RiskLimits::default());
    engine.update_pnl(1_500.0, -2_500.0);

    let metrics = engine.metrics();
    assert_eq!(metrics.daily_realized_pnl.load(Ordering::Acquire), 1_500.0);
    assert_eq!(metrics.daily_unrealized_pnl.load(Ordering::Acquire), -2_500.0);
    assert_eq!(metrics.daily_pnl.load(Ordering::Acquire), -1_000.0);
}

#[test]
fn decision_latency_is_recorded() {
    let tracker = Arc::new(HdrLatencyTracker::new());
    let engine = RiskEngine::with_latency_recorder(
        RiskLimits::default(),
        Arc::clone(&tracker) as Arc<dyn LatencyRecorder>,
    );

    for _ in 0..10 {
        engine.check_order("RELIANCE", Side::Buy, 10.0, 1);
    }
    assert_eq!(tracker.stats().count, 10);
}

#[test]
fn daily_reset_clears_counters_and_pnl() {
    let engine = engine_with(RiskLimits::default());
    engine.update_pnl(-5_000.0, -5_000.0);
    engine.record_trade();
    engine.record_market_messages(42);
    engine.check_order("RELIANCE", Side::Buy, 10.0, 1);

    engine.reset_daily();

    let metrics = engine.metrics();
    assert_eq!(metrics.daily_pnl.load(Ordering::Acquire), 0.0);
    assert_eq!(metrics.daily_trades.load(Ordering::Acquire), 0);
    assert_eq!(metrics.daily_orders.load(Ordering::Acquire), 0);
    assert_eq!(metrics.current_order_rate.load(Ordering::Acquire), 0);
    assert_eq!(metrics.current_message_rate.load(Ordering::Acquire), 0);
}

#[test]
fn concurrent_checks_account_every_order() {
    let engine = Arc::new(engine_with(RiskLimits {
        // High rate ceiling so nothing is rejected
        max_order_rate: u32::MAX,
        ..RiskLimits::default()
    }));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            for _ in 0..500 {
                engine.check_order("RELIANCE", Side::Buy, 10.0, 1);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let metrics = engine.metrics();
    let admitted = metrics.daily_orders.load(Ordering::Acquire);
    let rejected = metrics.rejected_orders.load(Ordering::Acquire);
    assert_eq!(admitted + rejected, 2_000);
    assert_eq!(rejected, 0);
}

#[test]
fn monitor_breach_disables_subsequent_gate_calls() {
    let engine = engine_with(RiskLimits::default());
    let shutdown = Arc::new(AtomicBool::new(false));

    let monitor = RiskMonitor::new(
        engine.metrics(),
        engine.limits().clone(),
        AlertThresholds::default(),
        Arc::new(HdrLatencyTracker::new()),
        Arc::clone(&shutdown),
    )
    .spawn()
    .unwrap();

    assert!(engine.check_order("RELIANCE", Side::Buy, 10.0, 1));

    // Push the P&L past the limit and wait for the monitor to latch
    engine.update_pnl(0.0, -1_500_000.0);
    let metrics = engine.metrics();
    let deadline = Instant::now() + Duration::from_secs(2);
    while !metrics.emergency_stop.load(Ordering::Acquire) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    monitor.stop();

    assert!(metrics.emergency_stop.load(Ordering::Acquire));
    assert!(!engine.check_order("RELIANCE", Side::Buy, 10.0, 1));

    // Explicit reset re-opens the gate
    engine.update_pnl(0.0, 0.0);
    engine.resume_trading();
    assert!(engine.check_order("RELIANCE", Side::Buy, 10.0, 1));
}

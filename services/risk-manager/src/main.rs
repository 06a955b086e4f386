//! Risk monitor service
//!
//! Hosts the shared risk metrics, the pre-trade gate consumed in-process
//! by the trading threads, and the continuous monitoring loop. The async
//! rim exists only to multiplex shutdown signals; the monitor itself is
//! a plain OS thread.

use anyhow::Result;
use clap::Parser;
use risk_manager::config::RiskConfig;
use risk_manager::latency::HdrLatencyTracker;
use risk_manager::monitor::RiskMonitor;
use risk_manager::RiskEngine;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "risk-manager", about = "Pre-trade risk gate and monitor")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config/risk_monitor.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "risk_manager=info".into()),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "risk monitor failed to start");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting risk monitor");

    let config = if args.config.exists() {
        RiskConfig::from_file(&args.config)?
    } else {
        warn!(path = %args.config.display(), "config file not found, using defaults");
        RiskConfig::default()
    };

    info!(
        max_position_value = config.limits.max_position_value,
        max_portfolio_value = config.limits.max_portfolio_value,
        max_daily_loss = config.limits.max_daily_loss,
        max_order_value = config.limits.max_order_value,
        position_concentration = config.limits.position_concentration,
        max_order_rate = config.limits.max_order_rate,
        "risk limits initialized"
    );

    let latency = Arc::new(HdrLatencyTracker::new());
    let engine = RiskEngine::with_latency_recorder(
        config.limits.clone(),
        Arc::clone(&latency) as Arc<dyn risk_manager::latency::LatencyRecorder>,
    );
    let shutdown = Arc::new(AtomicBool::new(false));

    let monitor = RiskMonitor::new(
        engine.metrics(),
        config.limits,
        config.alerts,
        latency,
        Arc::clone(&shutdown),
    )
    .spawn()?;

    info!("risk monitor running, press Ctrl+C to stop");
    wait_for_shutdown().await;

    shutdown.store(true, Ordering::Release);
    monitor.stop();
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}

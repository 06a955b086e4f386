//! Market connector service
//!
//! Connects to the exchange feed, loads the symbol master, and logs the
//! decoded stream. The core engines run on their own threads; the async
//! rim exists only to multiplex shutdown signals.

use anyhow::Result;
use clap::Parser;
use market_connector::{FeedConfig, FeedHandler};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "market-connector", about = "Exchange market-data feed service")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config/feed.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "market_connector=info".into()),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "market connector failed to start");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting market connector");

    let config = if args.config.exists() {
        FeedConfig::from_file(&args.config)?
    } else {
        warn!(path = %args.config.display(), "config file not found, using defaults");
        FeedConfig::default()
    };

    let symbols = config.symbols.clone();
    let mut handler = FeedHandler::new(config);

    handler.register_trade_handler(|header, trade| {
        info!(
            sequence = header.sequence,
            symbol_id = trade.symbol_id,
            price = trade.price,
            quantity = trade.quantity,
            buyer = trade.buyer_broker_str(),
            seller = trade.seller_broker_str(),
            "trade"
        );
    });
    handler.register_quote_handler(|_header, quote| {
        info!(
            symbol_id = quote.symbol_id,
            bid = quote.bid_price,
            ask = quote.ask_price,
            "quote"
        );
    });
    handler.register_order_handler(|_header, order| {
        info!(
            symbol_id = order.symbol_id,
            order_id = order.order_id,
            status = order.order_status,
            "order update"
        );
    });

    if !handler.start(&symbols) {
        anyhow::bail!("feed startup failed");
    }

    wait_for_shutdown().await;

    info!(
        processed = handler.messages_processed(),
        errors = handler.parse_errors(),
        rate = handler.message_rate(),
        "stopping feed"
    );
    handler.stop();
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
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

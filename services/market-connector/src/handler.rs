//! Feed handler facade
//!
//! Subscription surface for consumers: registers typed handlers, wires
//! them into the framing parser, and runs the transport. Consumer
//! panics are absorbed here so they can never tear down the receiver
//! thread.

use crate::config::FeedConfig;
use crate::instruments::SymbolRegistry;
use crate::protocol::MessageHeader;
use crate::protocol::messages::{OrderUpdateMessage, QuoteMessage, TradeMessage};
use crate::protocol::parser::{FeedParser, ParserStats};
use crate::transport::FeedTransport;
use services_common::clock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info};

type TradeHandler = Arc<dyn Fn(&MessageHeader, &TradeMessage) + Send + Sync>;
type QuoteHandler = Arc<dyn Fn(&MessageHeader, &QuoteMessage) + Send + Sync>;
type OrderHandler = Arc<dyn Fn(&MessageHeader, &OrderUpdateMessage) + Send + Sync>;

/// Consumer-facing feed surface
pub struct FeedHandler {
    config: FeedConfig,
    registry: SymbolRegistry,
    transport: FeedTransport,
    stats: Option<Arc<ParserStats>>,
    started_ns: u64,
    trade_handler: Option<TradeHandler>,
    quote_handler: Option<QuoteHandler>,
    order_handler: Option<OrderHandler>,
}

impl FeedHandler {
    /// Create a handler for the given feed configuration
    #[must_use]
    pub fn new(config: FeedConfig) -> Self {
        let transport = FeedTransport::new(config.max_message_rate, config.max_connects_per_minute);
        Self {
            config,
            registry: SymbolRegistry::new(),
            transport,
            stats: None,
            started_ns: 0,
            trade_handler: None,
            quote_handler: None,
            order_handler: None,
        }
    }

    /// Register the trade consumer; call before [`Self::start`]
    pub fn register_trade_handler(
        &mut self,
        handler: impl Fn(&MessageHeader, &TradeMessage) + Send + Sync + 'static,
    ) {
        self.trade_handler = Some(Arc::new(handler));
    }

    /// Register the quote consumer; call before [`Self::start`]
    pub fn register_quote_handler(
        &mut self,
        handler: impl Fn(&MessageHeader, &QuoteMessage) + Send + Sync + 'static,
    ) {
        self.quote_handler = Some(Arc::new(handler));
    }

    /// Register the order-update consumer; call before [`Self::start`]
    pub fn register_order_handler(
        &mut self,
        handler: impl Fn(&MessageHeader, &OrderUpdateMessage) + Send + Sync + 'static,
    ) {
        self.order_handler = Some(Arc::new(handler));
    }

    /// Load the symbol master, connect, and start dispatching
    pub fn start(&mut self, symbols: &[String]) -> bool {
        info!(count = symbols.len(), "starting feed");

        if !self.registry.load_master(&self.config.symbol_master) {
            error!("failed to load symbol master");
            return false;
        }

        let parser = self.build_parser();
        self.stats = Some(parser.stats());

        if let Err(e) = self
            .transport
            .connect(&self.config.host, self.config.port, parser)
        {
            error!(error = %e, "failed to connect to exchange feed");
            return false;
        }

        self.started_ns = clock::monotonic_nanos();
        for symbol in symbols {
            self.subscribe_trades(symbol);
            self.subscribe_quotes(symbol);
        }
        true
    }

    /// Stop the transport; idempotent
    pub fn stop(&mut self) {
        self.transport.disconnect();
    }

    /// Announce a trade subscription (the push protocol is server-side;
    /// this is informational)
    pub fn subscribe_trades(&self, symbol: &str) {
        debug!(symbol, id = self.registry.id_of(symbol), "subscribing to trades");
    }

    /// Announce a quote subscription
    pub fn subscribe_quotes(&self, symbol: &str) {
        debug!(symbol, id = self.registry.id_of(symbol), "subscribing to quotes");
    }

    /// Announce an order-stream subscription
    pub fn subscribe_orders(&self, symbol: &str) {
        debug!(symbol, id = self.registry.id_of(symbol), "subscribing to orders");
    }

    /// Whether the receiver is live
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Frames dispatched since start
    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.stats
            .as_ref()
            .map_or(0, |s| s.messages_processed.load(Ordering::Acquire))
    }

    /// Frames dropped since start
    #[must_use]
    pub fn parse_errors(&self) -> u64 {
        self.stats
            .as_ref()
            .map_or(0, |s| s.parse_errors.load(Ordering::Acquire))
    }

    /// Average dispatched messages per second since start
    #[must_use]
    pub fn message_rate(&self) -> f64 {
        if self.started_ns == 0 {
            return 0.0;
        }
        let elapsed_ns = clock::monotonic_nanos().saturating_sub(self.started_ns);
        if elapsed_ns == 0 {
            return 0.0;
        }
        // Precision loss is fine for a monitoring figure
        self.messages_processed() as f64 * 1e9 / elapsed_ns as f64
    }

    /// Monotonic nanos of the last dispatched frame; `None` before the
    /// first one
    #[must_use]
    pub fn last_message_time(&self) -> Option<u64> {
        let ns = self
            .stats
            .as_ref()
            .map_or(0, |s| s.last_message_ns.load(Ordering::Acquire));
        (ns != 0).then_some(ns)
    }

    /// The loaded symbol master view
    #[must_use]
    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    fn build_parser(&self) -> FeedParser {
        let mut parser = FeedParser::new();

        if let Some(handler) = self.trade_handler.clone() {
            parser.set_trade_callback(move |header, trade| {
                dispatch_guarded("trade", || handler(header, trade));
            });
        }
        if let Some(handler) = self.quote_handler.clone() {
            parser.set_quote_callback(move |header, quote| {
                dispatch_guarded("quote", || handler(header, quote));
            });
        }
        if let Some(handler) = self.order_handler.clone() {
            parser.set_order_callback(move |header, order| {
                dispatch_guarded("order", || handler(header, order));
            });
        }

        parser
    }
}

/// Run a consumer callback, absorbing panics at the facade boundary
fn dispatch_guarded(kind: &str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        error!(kind, "consumer handler panicked");
    }
}

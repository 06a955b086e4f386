//! Framing state machine
//!
//! Consumes an arbitrarily fragmented byte stream and dispatches whole,
//! validated frames to typed callbacks. All malformation is local: a bad
//! frame costs a counter bump and a log line, never the stream. The
//! parser is single-writer; it lives on the receiver thread and shares
//! only its [`ParserStats`] with other threads.

use super::messages::{
    ORDER_PAYLOAD_SIZE, OrderUpdateMessage, QUOTE_PAYLOAD_SIZE, QuoteMessage, TRADE_PAYLOAD_SIZE,
    TradeMessage, decode_order_update, decode_quote, decode_trade,
};
use super::{BUFFER_SIZE, HEADER_SIZE, MAX_PRICE, MAX_QUANTITY, MessageHeader, MessageKind};
use services_common::clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Framing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    WaitingHeader,
    ReadingPayload,
    MessageComplete,
    Error,
}

/// Counters shared between the parser and its observers
#[derive(Debug, Default)]
pub struct ParserStats {
    /// Frames validated and dispatched
    pub messages_processed: AtomicU64,
    /// Frames dropped for framing or semantic violations
    pub parse_errors: AtomicU64,
    /// Monotonic nanos of the last dispatched frame (0 = none yet)
    pub last_message_ns: AtomicU64,
}

type TradeCallback = Box<dyn FnMut(&MessageHeader, &TradeMessage) + Send>;
type QuoteCallback = Box<dyn FnMut(&MessageHeader, &QuoteMessage) + Send>;
type OrderCallback = Box<dyn FnMut(&MessageHeader, &OrderUpdateMessage) + Send>;

/// Streaming frame parser for one feed connection
pub struct FeedParser {
    state: ParserState,
    buffer: Box<[u8]>,
    write_pos: usize,
    expected_len: usize,
    stats: Arc<ParserStats>,
    on_trade: Option<TradeCallback>,
    on_quote: Option<QuoteCallback>,
    on_order: Option<OrderCallback>,
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedParser {
    /// Create a parser with an empty accumulation buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParserState::WaitingHeader,
            buffer: vec![0u8; BUFFER_SIZE].into_boxed_slice(),
            write_pos: 0,
            expected_len: 0,
            stats: Arc::new(ParserStats::default()),
            on_trade: None,
            on_quote: None,
            on_order: None,
        }
    }

    /// Shared counters handle
    #[must_use]
    pub fn stats(&self) -> Arc<ParserStats> {
        Arc::clone(&self.stats)
    }

    /// Frames validated and dispatched so far
    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.stats.messages_processed.load(Ordering::Acquire)
    }

    /// Frames dropped so far
    #[must_use]
    pub fn parse_errors(&self) -> u64 {
        self.stats.parse_errors.load(Ordering::Acquire)
    }

    /// Register the trade dispatch target
    pub fn set_trade_callback(
        &mut self,
        callback: impl FnMut(&MessageHeader, &TradeMessage) + Send + 'static,
    ) {
        self.on_trade = Some(Box::new(callback));
    }

    /// Register the quote dispatch target
    pub fn set_quote_callback(
        &mut self,
        callback: impl FnMut(&MessageHeader, &QuoteMessage) + Send + 'static,
    ) {
        self.on_quote = Some(Box::new(callback));
    }

    /// Register the order-update dispatch target
    pub fn set_order_callback(
        &mut self,
        callback: impl FnMut(&MessageHeader, &OrderUpdateMessage) + Send + 'static,
    ) {
        self.on_order = Some(Box::new(callback));
    }

    /// Consume bytes from `data`, returning how many were taken
    ///
    /// Truncated frames are held across calls. Dispatched message
    /// sequences are invariant under input chunking: resynchronization
    /// after a bad header advances one byte at a time over the
    /// accumulated stream, so a garbage prefix cannot swallow the frames
    /// behind it.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        let mut consumed = 0;

        while consumed < data.len() || self.state == ParserState::MessageComplete {
            match self.state {
                ParserState::WaitingHeader => {
                    let needed = HEADER_SIZE - self.write_pos;
                    let take = needed.min(data.len() - consumed);

                    if self.write_pos + take > BUFFER_SIZE {
                        warn!("header accumulation past buffer capacity");
                        self.bump_error();
                        self.state = ParserState::Error;
                        continue;
                    }

                    self.buffer[self.write_pos..self.write_pos + take]
                        .copy_from_slice(&data[consumed..consumed + take]);
                    self.write_pos += take;
                    consumed += take;

                    if self.write_pos >= HEADER_SIZE {
                        match MessageHeader::decode(&self.buffer[..HEADER_SIZE]) {
                            Some(header) => {
                                self.expected_len = header.msg_length as usize;
                                self.state = if self.write_pos >= self.expected_len {
                                    ParserState::MessageComplete
                                } else {
                                    ParserState::ReadingPayload
                                };
                            }
                            None => {
                                self.bump_error();
                                // Resync: slide the window one byte and retry
                                self.buffer.copy_within(1..HEADER_SIZE, 0);
                                self.write_pos = HEADER_SIZE - 1;
                            }
                        }
                    }
                }

                ParserState::ReadingPayload => {
                    let needed = self.expected_len - self.write_pos;
                    let take = needed.min(data.len() - consumed);

                    if self.write_pos + take > BUFFER_SIZE
                        || self.write_pos + take > self.expected_len
                    {
                        warn!("payload accumulation past bounds");
                        self.bump_error();
                        self.state = ParserState::Error;
                        continue;
                    }

                    self.buffer[self.write_pos..self.write_pos + take]
                        .copy_from_slice(&data[consumed..consumed + take]);
                    self.write_pos += take;
                    consumed += take;

                    if self.write_pos >= self.expected_len {
                        self.state = ParserState::MessageComplete;
                    }
                }

                ParserState::MessageComplete => {
                    // Re-decode defensively; the header bytes have not moved
                    match MessageHeader::decode(&self.buffer[..HEADER_SIZE]) {
                        Some(header) => {
                            if self.validate_and_dispatch(&header) {
                                self.stats.messages_processed.fetch_add(1, Ordering::AcqRel);
                                self.stats
                                    .last_message_ns
                                    .store(clock::monotonic_nanos(), Ordering::Release);
                            } else {
                                self.bump_error();
                            }
                        }
                        None => {
                            warn!("header validation failed on complete frame");
                            self.bump_error();
                        }
                    }
                    self.reset_frame();
                }

                ParserState::Error => {
                    // Remaining input is returned unconsumed
                    self.reset_frame();
                    return consumed;
                }
            }
        }

        consumed
    }

    /// Drop any partial frame and return to header accumulation
    pub fn reset(&mut self) {
        self.reset_frame();
    }

    fn reset_frame(&mut self) {
        self.state = ParserState::WaitingHeader;
        self.write_pos = 0;
        self.expected_len = 0;
    }

    fn bump_error(&self) {
        self.stats.parse_errors.fetch_add(1, Ordering::AcqRel);
    }

    /// Semantic validation over the accumulated frame, then dispatch
    ///
    /// Runs only after full accumulation so the buffer advance is
    /// identical for valid and malformed frames, keeping the stream in
    /// sync across any single bad message.
    fn validate_and_dispatch(&mut self, header: &MessageHeader) -> bool {
        let payload = &self.buffer[HEADER_SIZE..self.expected_len];

        match header.kind {
            MessageKind::Trade => {
                if payload.len() != TRADE_PAYLOAD_SIZE {
                    warn!(len = payload.len(), "trade payload size mismatch");
                    return false;
                }
                let Some(trade) = decode_trade(payload) else {
                    return false;
                };
                if trade.price <= 0.0 || trade.price > MAX_PRICE {
                    warn!(price = trade.price, "invalid trade price");
                    return false;
                }
                if trade.quantity == 0 || trade.quantity > MAX_QUANTITY {
                    warn!(quantity = trade.quantity, "invalid trade quantity");
                    return false;
                }
                if let Some(callback) = self.on_trade.as_mut() {
                    callback(header, &trade);
                }
                true
            }

            MessageKind::Quote => {
                if payload.len() != QUOTE_PAYLOAD_SIZE {
                    warn!(len = payload.len(), "quote payload size mismatch");
                    return false;
                }
                let Some(quote) = decode_quote(payload) else {
                    return false;
                };
                let prices_ok = [quote.bid_price, quote.ask_price]
                    .into_iter()
                    .chain(quote.bid_levels.iter().map(|l| l.price))
                    .chain(quote.ask_levels.iter().map(|l| l.price))
                    .all(|p| (0.0..=MAX_PRICE).contains(&p));
                if !prices_ok {
                    warn!(
                        bid = quote.bid_price,
                        ask = quote.ask_price,
                        "invalid quote prices"
                    );
                    return false;
                }
                if quote.is_crossed() {
                    // Exchanges transiently emit crossed books; admit
                    warn!(
                        bid = quote.bid_price,
                        ask = quote.ask_price,
                        "crossed quote"
                    );
                }
                if let Some(callback) = self.on_quote.as_mut() {
                    callback(header, &quote);
                }
                true
            }

            MessageKind::OrderUpdate => {
                if payload.len() != ORDER_PAYLOAD_SIZE {
                    warn!(len = payload.len(), "order payload size mismatch");
                    return false;
                }
                let Some(order) = decode_order_update(payload) else {
                    return false;
                };
                if order.price < 0.0 || order.price > MAX_PRICE {
                    warn!(price = order.price, "invalid order price");
                    return false;
                }
                if order.quantity > MAX_QUANTITY {
                    warn!(quantity = order.quantity, "invalid order quantity");
                    return false;
                }
                if let Some(callback) = self.on_order.as_mut() {
                    callback(header, &order);
                }
                true
            }

            MessageKind::Heartbeat => {
                if self.expected_len != HEADER_SIZE {
                    warn!(len = self.expected_len, "heartbeat with payload");
                    return false;
                }
                true
            }

            // Length was validated with the header; no registered
            // consumers for these kinds
            MessageKind::MarketStatus | MessageKind::SymbolUpdate | MessageKind::IndexUpdate => {
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::messages::encode_heartbeat;
    use super::super::ExchangeId;
    use super::*;

    #[test]
    fn heartbeat_dispatches_at_exact_input_end() {
        let mut parser = FeedParser::new();
        let wire = encode_heartbeat(ExchangeId::Nse, 1, 0);
        assert_eq!(parser.feed(&wire), wire.len());
        assert_eq!(parser.messages_processed(), 1);
        assert_eq!(parser.parse_errors(), 0);
    }

    #[test]
    fn split_heartbeat_is_held_across_calls() {
        let mut parser = FeedParser::new();
        let wire = encode_heartbeat(ExchangeId::Nse, 2, 0);
        assert_eq!(parser.feed(&wire[..10]), 10);
        assert_eq!(parser.messages_processed(), 0);
        assert_eq!(parser.feed(&wire[10..]), wire.len() - 10);
        assert_eq!(parser.messages_processed(), 1);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut parser = FeedParser::new();
        let wire = encode_heartbeat(ExchangeId::Nse, 3, 0);
        parser.feed(&wire[..10]);
        parser.reset();
        // A fresh heartbeat parses cleanly from the first byte
        parser.feed(&wire);
        assert_eq!(parser.messages_processed(), 1);
        assert_eq!(parser.parse_errors(), 0);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut parser = FeedParser::new();
        assert_eq!(parser.feed(&[]), 0);
        assert_eq!(parser.parse_errors(), 0);
    }
}

//! Typed payloads and their wire codecs
//!
//! Decoders read fixed offsets from a fully accumulated payload slice.
//! Encoders exist for the simulator and test side; they produce whole
//! frames (header + payload) so the layout lives in one place.

use super::{ExchangeId, HEADER_SIZE, MessageHeader, MessageKind};
use serde::{Deserialize, Serialize};

/// Trade payload size in bytes
pub const TRADE_PAYLOAD_SIZE: usize = 48;
/// Quote payload size in bytes (best levels + two five-level ladders)
pub const QUOTE_PAYLOAD_SIZE: usize = 220;
/// Order-update payload size in bytes
pub const ORDER_PAYLOAD_SIZE: usize = 42;
/// Depth levels carried per book side
pub const DEPTH_LEVELS: usize = 5;
/// Broker id slot width
pub const BROKER_ID_LEN: usize = 8;

/// One executed trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeMessage {
    pub symbol_id: u64,
    pub trade_id: u64,
    pub price: f64,
    pub quantity: u64,
    /// Buyer broker id, NUL-terminated at the last byte after decode
    pub buyer_broker: [u8; BROKER_ID_LEN],
    /// Seller broker id, NUL-terminated at the last byte after decode
    pub seller_broker: [u8; BROKER_ID_LEN],
}

impl TradeMessage {
    /// Buyer broker id as text, trimmed at the first NUL
    #[must_use]
    pub fn buyer_broker_str(&self) -> &str {
        broker_str(&self.buyer_broker)
    }

    /// Seller broker id as text, trimmed at the first NUL
    #[must_use]
    pub fn seller_broker_str(&self) -> &str {
        broker_str(&self.seller_broker)
    }
}

fn broker_str(slot: &[u8; BROKER_ID_LEN]) -> &str {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(BROKER_ID_LEN);
    std::str::from_utf8(&slot[..end]).unwrap_or("")
}

/// One price level of a book ladder
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: f64,
    pub quantity: u64,
    pub num_orders: u16,
}

/// Top-of-book plus five-level ladders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteMessage {
    pub symbol_id: u64,
    pub bid_price: f64,
    pub bid_quantity: u64,
    pub ask_price: f64,
    pub ask_quantity: u64,
    pub bid_levels: [DepthLevel; DEPTH_LEVELS],
    pub ask_levels: [DepthLevel; DEPTH_LEVELS],
}

impl QuoteMessage {
    /// Best bid at or above best ask while both sides are quoted
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        self.bid_price > 0.0 && self.ask_price > 0.0 && self.bid_price >= self.ask_price
    }
}

/// Order lifecycle update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdateMessage {
    pub symbol_id: u64,
    pub order_id: u64,
    pub order_type: u8,
    pub price: f64,
    pub quantity: u64,
    pub disclosed_quantity: u64,
    pub order_status: u8,
}

fn read_u64_be(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

fn read_u16_be(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

// Doubles travel in host byte order (exchange convention), everything
// else big-endian.
fn read_f64_ne(buf: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_ne_bytes(bytes)
}

/// Decode a trade payload; `None` if the slice is short
#[must_use]
pub fn decode_trade(payload: &[u8]) -> Option<TradeMessage> {
    if payload.len() < TRADE_PAYLOAD_SIZE {
        return None;
    }

    let mut buyer_broker = [0u8; BROKER_ID_LEN];
    buyer_broker.copy_from_slice(&payload[32..40]);
    let mut seller_broker = [0u8; BROKER_ID_LEN];
    seller_broker.copy_from_slice(&payload[40..48]);

    // Broker slots are not required to be NUL-terminated on the wire
    buyer_broker[BROKER_ID_LEN - 1] = 0;
    seller_broker[BROKER_ID_LEN - 1] = 0;

    Some(TradeMessage {
        symbol_id: read_u64_be(payload, 0),
        trade_id: read_u64_be(payload, 8),
        price: read_f64_ne(payload, 16),
        quantity: read_u64_be(payload, 24),
        buyer_broker,
        seller_broker,
    })
}

/// Decode a quote payload; `None` if the slice is short
#[must_use]
pub fn decode_quote(payload: &[u8]) -> Option<QuoteMessage> {
    if payload.len() < QUOTE_PAYLOAD_SIZE {
        return None;
    }

    let mut quote = QuoteMessage {
        symbol_id: read_u64_be(payload, 0),
        bid_price: read_f64_ne(payload, 8),
        bid_quantity: read_u64_be(payload, 16),
        ask_price: read_f64_ne(payload, 24),
        ask_quantity: read_u64_be(payload, 32),
        bid_levels: [DepthLevel::default(); DEPTH_LEVELS],
        ask_levels: [DepthLevel::default(); DEPTH_LEVELS],
    };

    let mut offset = 40;
    for level in &mut quote.bid_levels {
        *level = decode_level(payload, offset);
        offset += 18;
    }
    for level in &mut quote.ask_levels {
        *level = decode_level(payload, offset);
        offset += 18;
    }

    Some(quote)
}

fn decode_level(payload: &[u8], offset: usize) -> DepthLevel {
    DepthLevel {
        price: read_f64_ne(payload, offset),
        quantity: read_u64_be(payload, offset + 8),
        num_orders: read_u16_be(payload, offset + 16),
    }
}

/// Decode an order-update payload; `None` if the slice is short
#[must_use]
pub fn decode_order_update(payload: &[u8]) -> Option<OrderUpdateMessage> {
    if payload.len() < ORDER_PAYLOAD_SIZE {
        return None;
    }

    Some(OrderUpdateMessage {
        symbol_id: read_u64_be(payload, 0),
        order_id: read_u64_be(payload, 8),
        order_type: payload[16],
        price: read_f64_ne(payload, 17),
        quantity: read_u64_be(payload, 25),
        disclosed_quantity: read_u64_be(payload, 33),
        order_status: payload[41],
    })
}

fn frame(kind: MessageKind, exchange: ExchangeId, sequence: u64, timestamp_ns: u64, payload: &[u8]) -> Vec<u8> {
    let header = MessageHeader {
        kind,
        exchange,
        msg_length: (HEADER_SIZE + payload.len()) as u32,
        sequence,
        timestamp_ns,
    };
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    out
}

/// Encode a trade frame
#[must_use]
pub fn encode_trade(
    trade: &TradeMessage,
    exchange: ExchangeId,
    sequence: u64,
    timestamp_ns: u64,
) -> Vec<u8> {
    let mut payload = [0u8; TRADE_PAYLOAD_SIZE];
    payload[0..8].copy_from_slice(&trade.symbol_id.to_be_bytes());
    payload[8..16].copy_from_slice(&trade.trade_id.to_be_bytes());
    payload[16..24].copy_from_slice(&trade.price.to_ne_bytes());
    payload[24..32].copy_from_slice(&trade.quantity.to_be_bytes());
    payload[32..40].copy_from_slice(&trade.buyer_broker);
    payload[40..48].copy_from_slice(&trade.seller_broker);
    frame(MessageKind::Trade, exchange, sequence, timestamp_ns, &payload)
}

/// Encode a quote frame
#[must_use]
pub fn encode_quote(
    quote: &QuoteMessage,
    exchange: ExchangeId,
    sequence: u64,
    timestamp_ns: u64,
) -> Vec<u8> {
    let mut payload = [0u8; QUOTE_PAYLOAD_SIZE];
    payload[0..8].copy_from_slice(&quote.symbol_id.to_be_bytes());
    payload[8..16].copy_from_slice(&quote.bid_price.to_ne_bytes());
    payload[16..24].copy_from_slice(&quote.bid_quantity.to_be_bytes());
    payload[24..32].copy_from_slice(&quote.ask_price.to_ne_bytes());
    payload[32..40].copy_from_slice(&quote.ask_quantity.to_be_bytes());

    let mut offset = 40;
    for level in quote.bid_levels.iter().chain(quote.ask_levels.iter()) {
        payload[offset..offset + 8].copy_from_slice(&level.price.to_ne_bytes());
        payload[offset + 8..offset + 16].copy_from_slice(&level.quantity.to_be_bytes());
        payload[offset + 16..offset + 18].copy_from_slice(&level.num_orders.to_be_bytes());
        offset += 18;
    }
    frame(MessageKind::Quote, exchange, sequence, timestamp_ns, &payload)
}

/// Encode an order-update frame
#[must_use]
pub fn encode_order_update(
    order: &OrderUpdateMessage,
    exchange: ExchangeId,
    sequence: u64,
    timestamp_ns: u64,
) -> Vec<u8> {
    let mut payload = [0u8; ORDER_PAYLOAD_SIZE];
    payload[0..8].copy_from_slice(&order.symbol_id.to_be_bytes());
    payload[8..16].copy_from_slice(&order.order_id.to_be_bytes());
    payload[16] = order.order_type;
    payload[17..25].copy_from_slice(&order.price.to_ne_bytes());
    payload[25..33].copy_from_slice(&order.quantity.to_be_bytes());
    payload[33..41].copy_from_slice(&order.disclosed_quantity.to_be_bytes());
    payload[41] = order.order_status;
    frame(MessageKind::OrderUpdate, exchange, sequence, timestamp_ns, &payload)
}

/// Encode a heartbeat frame (bare header)
#[must_use]
pub fn encode_heartbeat(exchange: ExchangeId, sequence: u64, timestamp_ns: u64) -> Vec<u8> {
    frame(MessageKind::Heartbeat, exchange, sequence, timestamp_ns, &[])
}

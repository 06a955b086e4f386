//! Exchange wire protocol
//!
//! Frames are a fixed 22-byte header followed by a kind-specific payload.
//! Integers are big-endian on the wire; prices are IEEE-754 doubles in
//! host byte order (exchange convention). `msg_length` covers the whole
//! frame, header included.

pub mod messages;
pub mod parser;

use tracing::warn;

/// Fixed header size in bytes: kind (1) + exchange (1) + length (4) +
/// sequence (8) + timestamp (8)
pub const HEADER_SIZE: usize = 22;
/// Smallest legal frame: a bare header (heartbeat)
pub const MIN_MESSAGE_SIZE: usize = HEADER_SIZE;
/// Largest legal frame
pub const MAX_MESSAGE_SIZE: usize = 4096;
/// Per-connection accumulation buffer capacity
pub const BUFFER_SIZE: usize = 1024 * 1024;

/// Upper bound on any price field
pub const MAX_PRICE: f64 = 999_999.99;
/// Upper bound on any quantity field
pub const MAX_QUANTITY: u64 = 99_999_999_999;

/// Message kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    Trade = 1,
    Quote = 2,
    OrderUpdate = 3,
    MarketStatus = 4,
    SymbolUpdate = 5,
    IndexUpdate = 6,
    Heartbeat = 7,
}

impl MessageKind {
    /// Decode the wire discriminant
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Trade),
            2 => Some(Self::Quote),
            3 => Some(Self::OrderUpdate),
            4 => Some(Self::MarketStatus),
            5 => Some(Self::SymbolUpdate),
            6 => Some(Self::IndexUpdate),
            7 => Some(Self::Heartbeat),
            _ => None,
        }
    }
}

/// Source exchange tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ExchangeId {
    Nse = 1,
    Bse = 2,
    Mcx = 3,
}

impl ExchangeId {
    /// Decode the wire discriminant
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Nse),
            2 => Some(Self::Bse),
            3 => Some(Self::Mcx),
            _ => None,
        }
    }
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MessageHeader {
    /// Message kind
    pub kind: MessageKind,
    /// Source exchange
    pub exchange: ExchangeId,
    /// Total frame length in bytes, header included
    pub msg_length: u32,
    /// Monotonically increasing sequence number
    pub sequence: u64,
    /// Producer timestamp, nanoseconds since the exchange epoch
    pub timestamp_ns: u64,
}

impl MessageHeader {
    /// Decode and validate a header from the first [`HEADER_SIZE`] bytes
    ///
    /// Returns `None` on an unknown kind or exchange, or a frame length
    /// outside `[MIN_MESSAGE_SIZE, MAX_MESSAGE_SIZE]`.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }

        let Some(kind) = MessageKind::from_u8(buf[0]) else {
            warn!(value = buf[0], "unknown message kind");
            return None;
        };
        let Some(exchange) = ExchangeId::from_u8(buf[1]) else {
            warn!(value = buf[1], "unknown exchange");
            return None;
        };

        let msg_length = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let length = msg_length as usize;
        if !(MIN_MESSAGE_SIZE..=MAX_MESSAGE_SIZE).contains(&length) {
            warn!(msg_length, "frame length out of bounds");
            return None;
        }

        let sequence = u64::from_be_bytes([
            buf[6], buf[7], buf[8], buf[9], buf[10], buf[11], buf[12], buf[13],
        ]);
        let timestamp_ns = u64::from_be_bytes([
            buf[14], buf[15], buf[16], buf[17], buf[18], buf[19], buf[20], buf[21],
        ]);

        Some(Self {
            kind,
            exchange,
            msg_length,
            sequence,
            timestamp_ns,
        })
    }

    /// Encode into wire form
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0] = self.kind as u8;
        out[1] = self.exchange as u8;
        out[2..6].copy_from_slice(&self.msg_length.to_be_bytes());
        out[6..14].copy_from_slice(&self.sequence.to_be_bytes());
        out[14..22].copy_from_slice(&self.timestamp_ns.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = MessageHeader {
            kind: MessageKind::Trade,
            exchange: ExchangeId::Nse,
            msg_length: 70,
            sequence: 12_345,
            timestamp_ns: 1_700_000_000_000_000_000,
        };
        let decoded = MessageHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_rejects_unknown_kind_and_exchange() {
        let mut wire = MessageHeader {
            kind: MessageKind::Heartbeat,
            exchange: ExchangeId::Bse,
            msg_length: HEADER_SIZE as u32,
            sequence: 1,
            timestamp_ns: 0,
        }
        .encode();

        wire[0] = 0xFF;
        assert!(MessageHeader::decode(&wire).is_none());
        wire[0] = MessageKind::Heartbeat as u8;
        wire[1] = 0xFF;
        assert!(MessageHeader::decode(&wire).is_none());
    }

    #[test]
    fn header_rejects_out_of_bounds_length() {
        let mut header = MessageHeader {
            kind: MessageKind::Heartbeat,
            exchange: ExchangeId::Nse,
            msg_length: (MAX_MESSAGE_SIZE + 1) as u32,
            sequence: 1,
            timestamp_ns: 0,
        };
        assert!(MessageHeader::decode(&header.encode()).is_none());

        header.msg_length = (MIN_MESSAGE_SIZE - 1) as u32;
        assert!(MessageHeader::decode(&header.encode()).is_none());

        header.msg_length = MIN_MESSAGE_SIZE as u32;
        assert!(MessageHeader::decode(&header.encode()).is_some());
    }

    #[test]
    fn header_requires_full_buffer() {
        assert!(MessageHeader::decode(&[0u8; HEADER_SIZE - 1]).is_none());
    }
}

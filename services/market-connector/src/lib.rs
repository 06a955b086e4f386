//! Exchange market-data connector
//!
//! Streaming ingestion of the exchange's binary feed protocol:
//! - Framing state machine and typed message decoders
//! - Symbol master registry
//! - TCP feed transport with a dedicated receiver thread
//! - Feed handler facade bridging decoded messages to consumer callbacks

pub mod config;
pub mod handler;
pub mod instruments;
pub mod protocol;
pub mod transport;

pub use config::FeedConfig;
pub use handler::FeedHandler;
pub use instruments::{InstrumentType, SymbolInfo, SymbolRegistry};
pub use protocol::parser::{FeedParser, ParserStats};
pub use protocol::{ExchangeId, MessageHeader, MessageKind};
pub use transport::FeedTransport;

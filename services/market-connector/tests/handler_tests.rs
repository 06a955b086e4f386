//! Facade behavior over a live local socket

use market_connector::protocol::ExchangeId;
use market_connector::protocol::messages::encode_trade;
use market_connector::protocol::messages::TradeMessage;
use market_connector::{FeedConfig, FeedHandler};
use std::io::Write;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn trade(symbol_id: u64) -> TradeMessage {
    TradeMessage {
        symbol_id,
        trade_id: symbol_id * 10,
        price: 100.0 + symbol_id as f64,
        quantity: 500,
        buyer_broker: *b"BUYER01\0",
        seller_broker: *b"SELL01\0\0",
    }
}

#[test]
fn feed_handler_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = std::thread::spawn(move || {
        let (mut peer, _) = listener.accept().unwrap();
        let mut stream = Vec::new();
        for symbol_id in [1u64, 2, 3] {
            stream.extend_from_slice(&encode_trade(
                &trade(symbol_id),
                ExchangeId::Nse,
                symbol_id,
                0,
            ));
        }
        peer.write_all(&stream).unwrap();
        peer.flush().unwrap();
        std::thread::sleep(Duration::from_millis(300));
    });

    let config = FeedConfig {
        host: "127.0.0.1".to_string(),
        port,
        // Nonexistent master: the deterministic fallback set loads
        symbol_master: PathBuf::from("/nonexistent/symbols.csv"),
        ..FeedConfig::default()
    };

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut handler = FeedHandler::new(config);
    handler.register_trade_handler(move |_header, trade| {
        sink.lock().unwrap().push(trade.symbol_id);
    });

    assert!(handler.start(&["RELIANCE".to_string(), "TCS".to_string()]));
    assert!(handler.is_connected());
    assert_eq!(handler.registry().id_of("RELIANCE"), 1);

    let deadline = Instant::now() + Duration::from_secs(2);
    while handler.messages_processed() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(handler.messages_processed(), 3);
    assert_eq!(handler.parse_errors(), 0);
    assert!(handler.last_message_time().is_some());
    assert!(handler.message_rate() > 0.0);

    handler.stop();
    handler.stop();
    assert!(!handler.is_connected());
    server.join().unwrap();
}

#[test]
fn panicking_consumer_does_not_kill_the_receiver() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = std::thread::spawn(move || {
        let (mut peer, _) = listener.accept().unwrap();
        for symbol_id in [1u64, 2] {
            peer.write_all(&encode_trade(&trade(symbol_id), ExchangeId::Nse, symbol_id, 0))
                .unwrap();
        }
        peer.flush().unwrap();
        std::thread::sleep(Duration::from_millis(300));
    });

    let config = FeedConfig {
        host: "127.0.0.1".to_string(),
        port,
        symbol_master: PathBuf::from("/nonexistent/symbols.csv"),
        ..FeedConfig::default()
    };

    // An atomic counter: a panicking consumer must not poison test state
    let seen = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&seen);

    let mut handler = FeedHandler::new(config);
    handler.register_trade_handler(move |_header, trade| {
        sink.fetch_add(1, Ordering::AcqRel);
        if trade.symbol_id == 1 {
            panic!("consumer bug");
        }
    });

    assert!(handler.start(&[]));

    let deadline = Instant::now() + Duration::from_secs(2);
    while handler.messages_processed() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    handler.stop();

    // Both frames were dispatched despite the first consumer panic
    assert_eq!(seen.load(Ordering::Acquire), 2);
    assert_eq!(handler.messages_processed(), 2);
}

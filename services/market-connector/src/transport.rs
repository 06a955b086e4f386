//! TCP feed transport
//!
//! Owns the exchange socket and the receiver thread. Bytes flow straight
//! from `recv` into the framing parser; a token bucket throttles ingress
//! and a sliding window throttles reconnect attempts. Nothing here holds
//! a lock across I/O.

use crate::protocol::parser::FeedParser;
use services_common::{FeedError, SlidingWindowLimiter, TokenBucket};
use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info, warn};

/// Connect completion deadline
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Receiver poll interval; the read wakes at least this often to check
/// the disconnect flag
const POLL_TIMEOUT: Duration = Duration::from_secs(1);
/// Receiver scratch buffer size
const RECV_CHUNK: usize = 4096;
/// Kernel receive buffer request
const RECV_BUFFER_BYTES: usize = 1024 * 1024;
/// Connection-attempt window
const CONNECT_WINDOW: Duration = Duration::from_secs(60);

/// TCP connection to the exchange feed with a dedicated receiver thread
pub struct FeedTransport {
    connected: Arc<AtomicBool>,
    stream: Option<TcpStream>,
    worker: Option<JoinHandle<()>>,
    connection_limiter: SlidingWindowLimiter,
    message_limiter: Arc<TokenBucket>,
}

impl FeedTransport {
    /// Create a transport with the given ingress and reconnect budgets
    #[must_use]
    pub fn new(max_message_rate: u32, max_connects_per_minute: u32) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(false)),
            stream: None,
            worker: None,
            connection_limiter: SlidingWindowLimiter::new(max_connects_per_minute, CONNECT_WINDOW),
            message_limiter: Arc::new(TokenBucket::new(max_message_rate, max_message_rate)),
        }
    }

    /// Connect and start the receiver, which feeds `parser`
    ///
    /// The parser moves into the receiver thread; a fresh one is built
    /// per connection so framing state never leaks across sessions.
    pub fn connect(&mut self, host: &str, port: u16, parser: FeedParser) -> Result<(), FeedError> {
        if !self.connection_limiter.try_acquire() {
            return Err(FeedError::RateLimited(format!(
                "connection attempts to {host}:{port} exceeded window budget"
            )));
        }

        if self.connected.load(Ordering::Acquire) {
            self.disconnect();
        }

        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| FeedError::ConnectionFailed(format!("cannot resolve {host}:{port}")))?;

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(|e| {
            if e.kind() == ErrorKind::TimedOut {
                FeedError::Timeout(format!("{host}:{port}"))
            } else {
                FeedError::ConnectionFailed(format!("{host}:{port}: {e}"))
            }
        })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY");
        }
        if let Err(e) = set_recv_buffer(&stream, RECV_BUFFER_BYTES) {
            warn!(error = %e, "failed to set SO_RCVBUF");
        }
        stream.set_read_timeout(Some(POLL_TIMEOUT))?;

        let worker_stream = stream.try_clone()?;
        self.connected.store(true, Ordering::Release);

        let connected = Arc::clone(&self.connected);
        let limiter = Arc::clone(&self.message_limiter);
        let worker = std::thread::Builder::new()
            .name("feed-receiver".to_string())
            .spawn(move || receiver_loop(worker_stream, parser, connected, limiter))
            .map_err(|e| {
                self.connected.store(false, Ordering::Release);
                FeedError::ConnectionFailed(format!("cannot spawn receiver: {e}"))
            })?;

        self.worker = Some(worker);
        self.stream = Some(stream);
        info!(host, port, "connected to exchange feed");
        Ok(())
    }

    /// Stop the receiver and close the socket; idempotent
    pub fn disconnect(&mut self) {
        self.connected.store(false, Ordering::Release);

        // Wake the receiver out of its read
        if let Some(stream) = &self.stream {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        if self.stream.take().is_some() {
            info!("disconnected from exchange feed");
        }
    }

    /// Whether the receiver is live
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Remaining ingress budget, for monitoring
    #[must_use]
    pub fn available_message_tokens(&self) -> u32 {
        self.message_limiter.available_tokens()
    }
}

impl Drop for FeedTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn receiver_loop(
    mut stream: TcpStream,
    mut parser: FeedParser,
    connected: Arc<AtomicBool>,
    message_limiter: Arc<TokenBucket>,
) {
    info!("feed receiver started");
    let mut scratch = [0u8; RECV_CHUNK];

    while connected.load(Ordering::Acquire) {
        match stream.read(&mut scratch) {
            Ok(0) => {
                info!("feed connection closed by peer");
                break;
            }
            Ok(n) => {
                if !message_limiter.try_acquire(1) {
                    warn!(bytes = n, "message rate limit exceeded, dropping data");
                    continue;
                }
                let consumed = parser.feed(&scratch[..n]);
                if consumed < n {
                    warn!(consumed, received = n, "parser applied back-pressure");
                }
            }
            // Poll timeout: loop around and re-check the disconnect flag
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                error!(error = %e, "unrecoverable feed read error");
                break;
            }
        }
    }

    connected.store(false, Ordering::Release);
    info!("feed receiver exiting");
}

#[cfg(unix)]
fn set_recv_buffer(stream: &TcpStream, bytes: usize) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let value = libc::c_int::try_from(bytes).unwrap_or(libc::c_int::MAX);
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            std::ptr::from_ref(&value).cast::<libc::c_void>(),
            libc::socklen_t::try_from(std::mem::size_of_val(&value)).unwrap_or(0),
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn set_recv_buffer(_stream: &TcpStream, _bytes: usize) -> std::io::Result<()> {
    Ok(())
}

//! Numeric constants shared across services

/// Time conversion constants
pub mod time {
    /// Nanoseconds per millisecond
    pub const NANOS_PER_MILLI: u64 = 1_000_000;
    /// Nanoseconds per second
    pub const NANOS_PER_SEC: u64 = 1_000_000_000;
    /// Milliseconds per second
    pub const MILLIS_PER_SEC: u64 = 1_000;
}

//! Error types surfaced by the reliability engine.

use std::fmt;

/// Result type alias for reliability-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors the reliability engine can surface to its caller.
///
/// Transient, locally-recoverable conditions (a duplicate ack, an ack outside
/// the SACK window) never appear here — they are handled internally and, at
/// most, logged at `trace` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The retransmit buffer is at capacity; the sender must pause.
    Backpressure,
    /// An ACK frame was malformed (wrong size).
    ProtocolError,
    /// A pending packet exceeded `max_retries`; the flow is terminal.
    FlowFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Backpressure => write!(f, "retransmit buffer full, sender must pause"),
            Error::ProtocolError => write!(f, "malformed ACK frame"),
            Error::FlowFailed => write!(f, "retry count exceeded max_retries"),
        }
    }
}

impl std::error::Error for Error {}

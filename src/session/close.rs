//! Why a session ended

use std::fmt;
use std::io;

/// Reason a client session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed its end of the connection
    PeerClosed,
    /// Reading from or writing to the socket failed
    Socket(io::ErrorKind),
    /// The client sent a record longer than the allowed maximum
    LineTooLong,
    /// The broadcast ended and the queue was drained
    BroadcastEnded,
    /// The dispatcher evicted this subscriber for falling behind
    Evicted,
    /// Forwarding client input to the device failed
    DeviceWrite,
}

impl CloseReason {
    /// Whether the session ended because of a fault rather than a normal close
    pub fn is_error(&self) -> bool {
        !matches!(self, CloseReason::PeerClosed | CloseReason::BroadcastEnded)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed"),
            CloseReason::Socket(kind) => write!(f, "socket error: {}", kind),
            CloseReason::LineTooLong => write!(f, "client line too long"),
            CloseReason::BroadcastEnded => write!(f, "broadcast ended"),
            CloseReason::Evicted => write!(f, "evicted: too slow"),
            CloseReason::DeviceWrite => write!(f, "device write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_error() {
        assert!(!CloseReason::PeerClosed.is_error());
        assert!(!CloseReason::BroadcastEnded.is_error());
        assert!(CloseReason::Evicted.is_error());
        assert!(CloseReason::Socket(io::ErrorKind::ConnectionReset).is_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(CloseReason::Evicted.to_string(), "evicted: too slow");
        assert!(CloseReason::Socket(io::ErrorKind::BrokenPipe)
            .to_string()
            .starts_with("socket error"));
    }
}

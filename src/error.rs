//! Error types
//!
//! `Error` covers the fatal and stream-fatal conditions of the bridge.
//! Per-connection problems are handled inside the session and never
//! surface here.

use std::net::SocketAddr;

use thiserror::Error;

use crate::registry::RegistryError;

/// Result alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// The serial device could not be opened or configured
    #[error("failed to open serial device '{path}': {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// The TCP listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on the device or a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record exceeded the configured maximum length
    #[error("line exceeds maximum length of {max} bytes")]
    LineTooLong { max: usize },

    /// The line source failed earlier and can no longer produce lines
    #[error("line source has failed")]
    SourceFailed,

    /// Registry operation failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl Error {
    /// Whether this error ends the broadcast service
    pub fn is_stream_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::LineTooLong { .. } | Error::SourceFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_too_long_message() {
        let err = Error::LineTooLong { max: 16 };
        assert!(err.to_string().contains("16"));
        assert!(err.is_stream_fatal());
    }

    #[test]
    fn test_bind_error_message() {
        let addr: SocketAddr = "127.0.0.1:1812".parse().unwrap();
        let err = Error::Bind {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:1812"));
        assert!(msg.contains("in use"));
        assert!(!err.is_stream_fatal());
    }

    #[test]
    fn test_registry_error_converts() {
        let err: Error = RegistryError::AtCapacity { capacity: 2 }.into();
        assert!(matches!(err, Error::Registry(RegistryError::AtCapacity { capacity: 2 })));
    }
}

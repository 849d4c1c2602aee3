//! Session context
//!
//! Identity of one client session, carried into log events.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Identity and timing of a client session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// When the session was admitted
    pub connected_at: Instant,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr,
            connected_at: Instant::now(),
        }
    }

    /// Time since admission
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

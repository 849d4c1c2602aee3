//! Statistics for subscribers and the dispatcher

use std::net::SocketAddr;
use std::time::Duration;

/// Per-subscriber statistics
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    /// Subscriber ID
    pub id: u64,
    /// Remote peer, if any
    pub peer_addr: Option<SocketAddr>,
    /// Lines queued for this subscriber
    pub delivered: u64,
    /// Lines skipped under `OverflowPolicy::DropLine`
    pub dropped: u64,
    /// Time since registration
    pub connected_for: Duration,
}

/// Dispatcher-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Lines read from the source
    pub lines: u64,
    /// Individual queue insertions
    pub deliveries: u64,
    /// Lines skipped for slow subscribers
    pub drops: u64,
    /// Subscribers evicted as slow
    pub evictions: u64,
    /// Dispatches that had to wait on at least one full queue
    pub stalled_dispatches: u64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average number of recipients per line
    pub fn fan_out_ratio(&self) -> f64 {
        if self.lines == 0 {
            0.0
        } else {
            self.deliveries as f64 / self.lines as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_stats_new() {
        let stats = DispatchStats::new();
        assert_eq!(stats.lines, 0);
        assert_eq!(stats.deliveries, 0);
        assert_eq!(stats.drops, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.fan_out_ratio(), 0.0);
    }

    #[test]
    fn test_fan_out_ratio() {
        let stats = DispatchStats {
            lines: 4,
            deliveries: 10,
            ..Default::default()
        };

        assert_eq!(stats.fan_out_ratio(), 2.5);
    }
}

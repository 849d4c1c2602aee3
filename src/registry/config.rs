//! Registry configuration

use std::time::Duration;

/// Default maximum number of concurrently registered subscribers
pub const DEFAULT_CAPACITY: usize = 10;

/// What the dispatcher does with a subscriber whose queue stays full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the subscriber; its session is torn down
    Disconnect,
    /// Skip the line for that subscriber and count the drop
    DropLine,
}

/// Configuration for the subscriber registry and fan-out
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum concurrent subscribers
    pub capacity: usize,

    /// Lines buffered per subscriber before it counts as slow
    pub queue_capacity: usize,

    /// Longest a single dispatch waits on full subscriber queues
    pub send_timeout: Duration,

    /// Policy applied once `send_timeout` elapses
    pub overflow_policy: OverflowPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            queue_capacity: 256,
            send_timeout: Duration::from_millis(500),
            overflow_policy: OverflowPolicy::Disconnect,
        }
    }
}

impl RegistryConfig {
    /// Set maximum concurrent subscribers
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set per-subscriber queue size (at least 1)
    pub fn queue_capacity(mut self, size: usize) -> Self {
        self.queue_capacity = size.max(1);
        self
    }

    /// Set the dispatch wait bound for full queues
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.capacity, 10);
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.send_timeout, Duration::from_millis(500));
        assert_eq!(config.overflow_policy, OverflowPolicy::Disconnect);
    }

    #[test]
    fn test_queue_capacity_floor() {
        let config = RegistryConfig::default().queue_capacity(0);

        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .capacity(2)
            .queue_capacity(8)
            .send_timeout(Duration::from_millis(50))
            .overflow_policy(OverflowPolicy::DropLine);

        assert_eq!(config.capacity, 2);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.send_timeout, Duration::from_millis(50));
        assert_eq!(config.overflow_policy, OverflowPolicy::DropLine);
    }
}

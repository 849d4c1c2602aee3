//! Session-side handle to a registered subscriber

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::source::Line;

use super::entry::SubscriberEntry;
use super::store::SubscriberRegistry;

/// Receiving end of a subscriber queue
///
/// Owned by exactly one session. Dropping it closes the queue and removes
/// the subscriber from the registry, so the slot is free once the drop
/// completes.
pub struct Subscription {
    entry: Arc<SubscriberEntry>,
    rx: mpsc::Receiver<Line>,
    registry: Arc<SubscriberRegistry>,
}

impl Subscription {
    pub(super) fn new(
        entry: Arc<SubscriberEntry>,
        rx: mpsc::Receiver<Line>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            entry,
            rx,
            registry,
        }
    }

    /// Subscriber ID
    pub fn id(&self) -> u64 {
        self.entry.id()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.entry.peer_addr()
    }

    /// Next queued line, or `None` once the queue is closed and drained
    pub async fn recv(&mut self) -> Option<Line> {
        self.rx.recv().await
    }

    /// Whether the queue was closed because this subscriber was too slow
    pub fn was_evicted(&self) -> bool {
        self.entry.is_evicted()
    }

    /// Registry-side entry
    pub fn entry(&self) -> &Arc<SubscriberEntry> {
        &self.entry
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        self.registry.unregister(self.entry.id());
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id())
            .field("peer_addr", &self.entry.peer_addr())
            .finish()
    }
}

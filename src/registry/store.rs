//! Subscriber registry implementation
//!
//! Membership is held as an immutable `Arc<[..]>` that is replaced on every
//! change (copy-on-write). The dispatcher takes a snapshot by cloning the
//! `Arc`, so fan-out never holds the registry lock and a slow subscriber
//! cannot hold up admissions.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;

use super::config::RegistryConfig;
use super::entry::SubscriberEntry;
use super::error::RegistryError;
use super::subscription::Subscription;
use crate::stats::SubscriberStats;

/// Immutable view of the members at one instant
#[derive(Debug, Clone)]
pub struct Snapshot {
    members: Arc<[Arc<SubscriberEntry>]>,
}

impl Snapshot {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SubscriberEntry>> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member IDs in registration order
    pub fn ids(&self) -> Vec<u64> {
        self.members.iter().map(|e| e.id()).collect()
    }
}

struct Members {
    list: Arc<[Arc<SubscriberEntry>]>,
    closed: bool,
}

/// Registry of active subscribers
///
/// Thread-safe via `RwLock`. Capacity check and insertion happen under the
/// same write lock, so concurrent admissions can never exceed capacity.
pub struct SubscriberRegistry {
    members: RwLock<Members>,
    next_id: AtomicU64,
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            members: RwLock::new(Members {
                list: Arc::from(Vec::new()),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Maximum concurrent subscribers
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Register a new subscriber
    ///
    /// Fails with [`RegistryError::AtCapacity`] when every slot is taken and
    /// with [`RegistryError::Closed`] once the broadcast has ended.
    pub fn register(
        self: &Arc<Self>,
        peer_addr: Option<SocketAddr>,
    ) -> Result<Subscription, RegistryError> {
        let mut members = self.write();

        if members.closed {
            return Err(RegistryError::Closed);
        }
        if members.list.len() >= self.config.capacity {
            return Err(RegistryError::AtCapacity {
                capacity: self.config.capacity,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let entry = Arc::new(SubscriberEntry::new(id, peer_addr, tx));

        let mut list = members.list.to_vec();
        list.push(Arc::clone(&entry));
        members.list = list.into();

        tracing::info!(
            subscriber_id = id,
            peer = ?peer_addr,
            subscribers = members.list.len(),
            capacity = self.config.capacity,
            "Subscriber added"
        );

        Ok(Subscription::new(entry, rx, Arc::clone(self)))
    }

    /// Remove a subscriber
    ///
    /// Its queue is closed before this returns, so it cannot receive any
    /// further line. Returns `false` if it was not a member.
    pub fn unregister(&self, id: u64) -> bool {
        let mut members = self.write();

        let Some(pos) = members.list.iter().position(|e| e.id() == id) else {
            return false;
        };

        members.list[pos].close();

        let list: Vec<_> = members
            .list
            .iter()
            .filter(|e| e.id() != id)
            .cloned()
            .collect();
        members.list = list.into();

        tracing::debug!(
            subscriber_id = id,
            subscribers = members.list.len(),
            "Subscriber removed"
        );

        true
    }

    /// Current members
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            members: Arc::clone(&self.read().list),
        }
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.read().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// End the broadcast
    ///
    /// Rejects further registrations and closes every member queue; the
    /// sessions drain, tear down and deregister themselves.
    pub fn close(&self) {
        let mut members = self.write();
        if members.closed {
            return;
        }
        members.closed = true;

        for entry in members.list.iter() {
            entry.close();
        }

        tracing::info!(subscribers = members.list.len(), "Registry closed");
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Per-subscriber statistics
    pub fn stats(&self) -> Vec<SubscriberStats> {
        self.snapshot().iter().map(|e| e.stats()).collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Members> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Members> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

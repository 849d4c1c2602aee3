//! Subscriber entry
//!
//! This module defines the per-subscriber state shared between the registry,
//! the dispatcher and the owning session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

use crate::source::Line;
use crate::stats::SubscriberStats;

/// Outcome of a non-blocking delivery attempt
#[derive(Debug)]
pub(crate) enum Delivery {
    /// Line queued
    Delivered,
    /// Queue full; the line is handed back
    Full(Line),
    /// Queue closed (session ending, evicted, or broadcast over)
    Closed,
}

/// Registry-side state of one subscriber
///
/// The queue sender sits behind a lock so that closing the queue and
/// pushing into it are mutually exclusive: once [`close`](Self::close)
/// returns, no further line can enter the queue.
#[derive(Debug)]
pub struct SubscriberEntry {
    id: u64,
    peer_addr: Option<SocketAddr>,
    tx: Mutex<Option<mpsc::Sender<Line>>>,
    evicted: AtomicBool,
    eviction: Notify,
    delivered: AtomicU64,
    dropped: AtomicU64,
    registered_at: Instant,
}

impl SubscriberEntry {
    pub(super) fn new(id: u64, peer_addr: Option<SocketAddr>, tx: mpsc::Sender<Line>) -> Self {
        Self {
            id,
            peer_addr,
            tx: Mutex::new(Some(tx)),
            evicted: AtomicBool::new(false),
            eviction: Notify::new(),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            registered_at: Instant::now(),
        }
    }

    /// Subscriber ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote peer address, if the subscriber is a network client
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Liveness flag: the queue is open and its receiver still exists
    pub fn is_live(&self) -> bool {
        self.lock_tx().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Whether the dispatcher evicted this subscriber as too slow
    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }

    /// Resolves once the subscriber has been evicted
    ///
    /// Sessions race this against their socket writes, so a peer that
    /// stopped reading cannot keep the session alive.
    pub async fn evicted(&self) {
        if self.is_evicted() {
            return;
        }
        self.eviction.notified().await;
    }

    pub fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            id: self.id,
            peer_addr: self.peer_addr,
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            connected_for: self.registered_at.elapsed(),
        }
    }

    /// Push a line without waiting
    pub(crate) fn try_deliver(&self, line: Line) -> Delivery {
        let guard = self.lock_tx();
        let Some(tx) = guard.as_ref() else {
            return Delivery::Closed;
        };
        match tx.try_send(line) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                Delivery::Delivered
            }
            Err(TrySendError::Full(line)) => Delivery::Full(line),
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Clone of the queue sender, used to wait for capacity
    pub(crate) fn sender(&self) -> Option<mpsc::Sender<Line>> {
        self.lock_tx().clone()
    }

    /// Push a line into a reserved slot, unless the queue was closed
    /// while the slot was being reserved
    pub(crate) fn deliver_reserved(&self, permit: mpsc::Permit<'_, Line>, line: Line) -> bool {
        let guard = self.lock_tx();
        if guard.is_none() {
            return false;
        }
        permit.send(line);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Close the queue; the session drains what is left and then ends
    pub(crate) fn close(&self) {
        self.lock_tx().take();
    }

    /// Mark as too slow and close the queue
    pub(crate) fn evict(&self) {
        self.evicted.store(true, Ordering::Release);
        self.close();
        self.eviction.notify_one();
    }

    fn lock_tx(&self) -> MutexGuard<'_, Option<mpsc::Sender<Line>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

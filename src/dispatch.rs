//! Fan-out dispatcher
//!
//! Drives the line source and pushes every line into the queue of every
//! subscriber registered at the moment the line is dispatched.
//!
//! Each dispatch first tries a non-blocking push to every member. Members
//! whose queue is full are then awaited against a single deadline of
//! `send_timeout`, so one dispatch never waits longer than that no matter
//! how many subscribers are slow. Whatever is still full at the deadline is
//! handled by the configured [`OverflowPolicy`].

use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::time::{timeout_at, Instant};

use crate::error::Result;
use crate::registry::{OverflowPolicy, SubscriberEntry, SubscriberRegistry};
use crate::registry::entry::Delivery;
use crate::source::{Line, LineSource};
use crate::stats::DispatchStats;

/// Single producer loop from a [`LineSource`] into the registry
pub struct Dispatcher<R> {
    source: LineSource<R>,
    registry: Arc<SubscriberRegistry>,
    stats: DispatchStats,
}

impl<R: AsyncRead + Unpin> Dispatcher<R> {
    pub fn new(source: LineSource<R>, registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            source,
            registry,
            stats: DispatchStats::new(),
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Run until the source ends or fails
    ///
    /// Either way the registry is closed before returning, so every session
    /// sees end of stream once it has drained its queue. A source failure is
    /// returned as the error.
    pub async fn run(mut self) -> Result<DispatchStats> {
        let result = loop {
            match self.source.next().await {
                Ok(Some(line)) => {
                    tracing::trace!(line = %line.to_string_lossy(), "device");
                    self.dispatch(line).await;
                }
                Ok(None) => {
                    tracing::info!(lines = self.stats.lines, "Line source ended");
                    break Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, lines = self.stats.lines, "Line source failed");
                    break Err(e);
                }
            }
        };

        self.registry.close();
        result.map(|()| self.stats)
    }

    /// Deliver one line to the current members
    ///
    /// Returns the number of subscribers the line was queued for.
    pub async fn dispatch(&mut self, line: Line) -> usize {
        self.stats.lines += 1;

        let snapshot = self.registry.snapshot();
        let mut delivered = 0;
        let mut pending = Vec::new();

        for entry in snapshot.iter() {
            match entry.try_deliver(line.clone()) {
                Delivery::Delivered => delivered += 1,
                Delivery::Full(line) => pending.push((entry, line)),
                Delivery::Closed => {}
            }
        }

        if !pending.is_empty() {
            self.stats.stalled_dispatches += 1;
            let deadline = Instant::now() + self.registry.config().send_timeout;

            for (entry, line) in pending {
                if self.deliver_by(entry, line, deadline).await {
                    delivered += 1;
                }
            }
        }

        self.stats.deliveries += delivered as u64;
        delivered
    }

    async fn deliver_by(
        &mut self,
        entry: &Arc<SubscriberEntry>,
        line: Line,
        deadline: Instant,
    ) -> bool {
        let Some(tx) = entry.sender() else {
            return false;
        };

        let reserved = timeout_at(deadline, tx.reserve()).await;
        match reserved {
            Ok(Ok(permit)) => entry.deliver_reserved(permit, line),
            Ok(Err(_)) => false,
            Err(_) => {
                match self.registry.config().overflow_policy {
                    OverflowPolicy::Disconnect => {
                        entry.evict();
                        self.registry.unregister(entry.id());
                        self.stats.evictions += 1;
                        tracing::warn!(
                            subscriber_id = entry.id(),
                            peer = ?entry.peer_addr(),
                            "Subscriber evicted: queue full"
                        );
                    }
                    OverflowPolicy::DropLine => {
                        entry.record_drop();
                        self.stats.drops += 1;
                        tracing::debug!(
                            subscriber_id = entry.id(),
                            "Line dropped: queue full"
                        );
                    }
                }
                false
            }
        }
    }
}

//! Client connection session
//!
//! A session owns one accepted socket and one [`Subscription`]. It runs
//! both directions concurrently:
//!
//! - outbound: subscription queue → socket
//! - inbound: socket → [`DeviceWriter`]
//!
//! Whichever direction finishes first ends the session, and so does an
//! eviction: a peer that stopped reading may leave the outbound write
//! pending forever, so the session also waits on the eviction signal of its
//! registry entry. Teardown then happens once, in a fixed order: the
//! subscription is dropped (queue closed, slot freed), the write half is shut
//! down and both halves are dropped so the socket is fully closed.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::device::DeviceWriter;
use crate::error::Error;
use crate::registry::Subscription;
use crate::source::LineSource;

use super::close::CloseReason;
use super::context::SessionContext;

/// One admitted client
pub struct Connection<S> {
    ctx: SessionContext,
    socket: S,
    subscription: Subscription,
    device: DeviceWriter,
    max_line_length: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(
        ctx: SessionContext,
        socket: S,
        subscription: Subscription,
        device: DeviceWriter,
        max_line_length: usize,
    ) -> Self {
        Self {
            ctx,
            socket,
            subscription,
            device,
            max_line_length,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Run the session to completion
    pub async fn run(self) -> CloseReason {
        let Self {
            ctx,
            socket,
            mut subscription,
            device,
            max_line_length,
        } = self;

        let (read_half, mut write_half) = tokio::io::split(socket);
        let mut inbound = LineSource::with_max_line_length(read_half, max_line_length);
        let entry = Arc::clone(subscription.entry());

        let reason = tokio::select! {
            reason = send_lines(&mut subscription, &mut write_half) => reason,
            reason = forward_input(&mut inbound, &device, ctx.session_id) => reason,
            _ = entry.evicted() => CloseReason::Evicted,
        };

        drop(subscription);
        let _ = write_half.shutdown().await;
        drop(write_half);
        drop(inbound);

        if reason.is_error() {
            tracing::warn!(
                session_id = ctx.session_id,
                peer = %ctx.peer_addr,
                reason = %reason,
                duration_ms = ctx.duration().as_millis() as u64,
                "Session closed"
            );
        } else {
            tracing::debug!(
                session_id = ctx.session_id,
                peer = %ctx.peer_addr,
                reason = %reason,
                duration_ms = ctx.duration().as_millis() as u64,
                "Session closed"
            );
        }

        reason
    }
}

async fn send_lines<T>(subscription: &mut Subscription, writer: &mut T) -> CloseReason
where
    T: AsyncWrite + Unpin,
{
    while let Some(line) = subscription.recv().await {
        if let Err(e) = writer.write_all(line.framed()).await {
            return CloseReason::Socket(e.kind());
        }
        if let Err(e) = writer.flush().await {
            return CloseReason::Socket(e.kind());
        }
    }

    if subscription.was_evicted() {
        CloseReason::Evicted
    } else {
        CloseReason::BroadcastEnded
    }
}

async fn forward_input<R>(
    inbound: &mut LineSource<R>,
    device: &DeviceWriter,
    session_id: u64,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    loop {
        match inbound.next().await {
            Ok(Some(line)) => {
                tracing::trace!(session_id, line = %line.to_string_lossy(), "client");
                if let Err(e) = device.write_record(line.framed().clone()).await {
                    tracing::error!(session_id, error = %e, "Device write failed");
                    return CloseReason::DeviceWrite;
                }
            }
            Ok(None) => return CloseReason::PeerClosed,
            Err(Error::Io(e)) => return CloseReason::Socket(e.kind()),
            Err(Error::LineTooLong { .. }) => return CloseReason::LineTooLong,
            Err(e) => {
                tracing::debug!(session_id, error = %e, "Inbound read failed");
                return CloseReason::Socket(std::io::ErrorKind::Other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, DuplexStream};

    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::registry::{RegistryConfig, SubscriberRegistry};
    use crate::source::{Line, DEFAULT_MAX_LINE_LENGTH};

    struct Harness {
        registry: Arc<SubscriberRegistry>,
        client: DuplexStream,
        device: DuplexStream,
        writer: DeviceWriter,
        session: tokio::task::JoinHandle<CloseReason>,
    }

    fn start(config: RegistryConfig, max_line_length: usize) -> Harness {
        start_with_buffers(config, max_line_length, 1024, 1024)
    }

    fn start_with_buffers(
        config: RegistryConfig,
        max_line_length: usize,
        client_buffer: usize,
        device_buffer: usize,
    ) -> Harness {
        let registry = Arc::new(SubscriberRegistry::with_config(config));
        let (client, server) = tokio::io::duplex(client_buffer);
        let (host, device) = tokio::io::duplex(device_buffer);
        let writer = DeviceWriter::new(host);

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50000);
        let subscription = registry.register(Some(addr)).unwrap();
        let connection = Connection::new(
            SessionContext::new(1, addr),
            server,
            subscription,
            writer.clone(),
            max_line_length,
        );

        Harness {
            registry,
            client,
            device,
            writer,
            session: tokio::spawn(connection.run()),
        }
    }

    fn broadcast(registry: &SubscriberRegistry, text: &str) {
        for entry in registry.snapshot().iter() {
            entry.try_deliver(Line::from(text));
        }
    }

    #[tokio::test]
    async fn test_lines_reach_client() {
        let h = start(RegistryConfig::default(), DEFAULT_MAX_LINE_LENGTH);

        broadcast(&h.registry, "A");
        broadcast(&h.registry, "B");
        h.registry.close();

        let mut out = String::new();
        let mut client = h.client;
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "A\nB\n");

        assert_eq!(h.session.await.unwrap(), CloseReason::BroadcastEnded);
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn test_client_input_reaches_device() {
        let mut h = start(RegistryConfig::default(), DEFAULT_MAX_LINE_LENGTH);

        h.client.write_all(b"reset\r\nstatus\n").await.unwrap();

        let mut device = BufReader::new(h.device);
        let mut first = String::new();
        device.read_line(&mut first).await.unwrap();
        let mut second = String::new();
        device.read_line(&mut second).await.unwrap();

        assert_eq!(first, "reset\n");
        assert_eq!(second, "status\n");
    }

    #[tokio::test]
    async fn test_peer_close_deregisters() {
        let h = start(RegistryConfig::default(), DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(h.registry.len(), 1);

        drop(h.client);

        assert_eq!(h.session.await.unwrap(), CloseReason::PeerClosed);
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_closes_socket() {
        let h = start(
            RegistryConfig::default()
                .queue_capacity(1)
                .send_timeout(Duration::from_millis(10)),
            DEFAULT_MAX_LINE_LENGTH,
        );

        for entry in h.registry.snapshot().iter() {
            entry.evict();
        }

        assert_eq!(h.session.await.unwrap(), CloseReason::Evicted);
        assert!(h.registry.is_empty());

        let mut client = h.client;
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_non_reading_peer_is_evicted_and_frees_slot() {
        let h = start_with_buffers(
            RegistryConfig::default()
                .capacity(1)
                .queue_capacity(1)
                .send_timeout(Duration::from_millis(20)),
            DEFAULT_MAX_LINE_LENGTH,
            64,
            1024,
        );
        let mut dispatcher =
            Dispatcher::new(LineSource::new(tokio::io::empty()), Arc::clone(&h.registry));

        // The client never reads, so the session blocks on its socket write
        let payload = "x".repeat(200);
        for _ in 0..10 {
            dispatcher.dispatch(Line::new(&payload)).await;
        }
        assert_eq!(dispatcher.stats().evictions, 1);

        let reason = tokio::time::timeout(Duration::from_secs(2), h.session)
            .await
            .expect("evicted session did not end")
            .unwrap();
        assert_eq!(reason, CloseReason::Evicted);
        assert!(h.registry.is_empty());
        assert!(h.registry.register(None).is_ok());

        drop(h.client);
    }

    #[tokio::test]
    async fn test_torn_down_session_leaves_no_partial_record() {
        let mut h = start_with_buffers(RegistryConfig::default(), DEFAULT_MAX_LINE_LENGTH, 1024, 4);

        h.client.write_all(b"AAAAAAAAAA\n").await.unwrap();

        // The record is in flight: only the first chunk fits in the pipe
        let mut head = [0u8; 4];
        h.device.read_exact(&mut head).await.unwrap();
        assert_eq!(&head, b"AAAA");

        for entry in h.registry.snapshot().iter() {
            entry.evict();
        }
        assert_eq!(h.session.await.unwrap(), CloseReason::Evicted);

        let other = h.writer.clone();
        let next = tokio::spawn(async move { other.write_record(Bytes::from_static(b"BBB\n")).await });

        let mut rest = [0u8; 11];
        h.device.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"AAAAAA\nBBB\n");
        next.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_client_line_ends_session() {
        let mut h = start(RegistryConfig::default(), 8);

        h.client.write_all(b"this line is far too long\n").await.unwrap();

        assert_eq!(h.session.await.unwrap(), CloseReason::LineTooLong);
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn test_device_write_failure_ends_session() {
        let mut h = start(RegistryConfig::default(), DEFAULT_MAX_LINE_LENGTH);

        drop(h.device);
        h.client.write_all(b"hello\n").await.unwrap();

        assert_eq!(h.session.await.unwrap(), CloseReason::DeviceWrite);
        assert!(h.registry.is_empty());
    }
}

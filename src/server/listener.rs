//! Bridge server listener
//!
//! Handles the TCP accept loop, admits clients into the registry and spawns
//! their sessions. Also owns the dispatcher task for the device stream.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::device::DeviceWriter;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::registry::{RegistryConfig, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::session::{Connection, SessionContext};
use crate::source::LineSource;
use crate::stats::DispatchStats;

/// First pause after a failed accept
const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
/// Longest pause between accept retries
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Owns the dispatcher task for the lifetime of [`BridgeServer::serve`]
///
/// Dropping it aborts the dispatcher and closes the registry, so sessions
/// tear down even when the `serve` future itself is cancelled.
struct DispatchGuard {
    task: JoinHandle<Result<DispatchStats>>,
    registry: Arc<SubscriberRegistry>,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        self.task.abort();
        self.registry.close();
    }
}

/// Serial-to-TCP broadcast server
pub struct BridgeServer {
    config: ServerConfig,
    registry: Arc<SubscriberRegistry>,
    next_session_id: AtomicU64,
}

impl BridgeServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        Self {
            config,
            registry: Arc::new(SubscriberRegistry::with_config(registry_config)),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: self.config.bind_addr,
                source,
            })
    }

    /// Run the server
    ///
    /// Returns when the device stream ends, or with an error if it fails.
    pub async fn run<D>(&self, device: D) -> Result<()>
    where
        D: AsyncRead + AsyncWrite + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, device, std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<D, F>(&self, device: D, shutdown: F) -> Result<()>
    where
        D: AsyncRead + AsyncWrite + Send + 'static,
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve(listener, device, shutdown).await
    }

    /// Serve clients from an already bound listener
    ///
    /// The device stream is split: its read half feeds the dispatcher, its
    /// write half becomes the shared device write path for all sessions.
    /// Whatever ends the broadcast, the registry is closed on return so every
    /// live session drains and tears down.
    pub async fn serve<D, F>(&self, listener: TcpListener, device: D, shutdown: F) -> Result<()>
    where
        D: AsyncRead + AsyncWrite + Send + 'static,
        F: std::future::Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;

        let (reader, writer) = tokio::io::split(device);
        let device_writer = DeviceWriter::new(writer);
        let source = LineSource::with_max_line_length(reader, self.config.max_line_length);
        let mut dispatch = DispatchGuard {
            task: tokio::spawn(Dispatcher::new(source, Arc::clone(&self.registry)).run()),
            registry: Arc::clone(&self.registry),
        };

        tracing::info!(
            addr = %local_addr,
            capacity = self.registry.capacity(),
            "Bridge listening"
        );

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            joined = &mut dispatch.task => match joined {
                Ok(Ok(stats)) => {
                    tracing::info!(
                        lines = stats.lines,
                        deliveries = stats.deliveries,
                        drops = stats.drops,
                        evictions = stats.evictions,
                        "Broadcast ended"
                    );
                    Ok(())
                }
                Ok(Err(e)) => Err(e),
                Err(e) => Err(Error::Io(std::io::Error::other(e))),
            },
            result = self.accept_loop(&listener, &device_writer) => result,
        };

        drop(dispatch);
        result
    }

    async fn accept_loop(&self, listener: &TcpListener, device: &DeviceWriter) -> Result<()> {
        let mut consecutive_errors = 0u32;
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    consecutive_errors = 0;
                    self.handle_connection(socket, peer_addr, device);
                }
                Err(e) => {
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    let pause = accept_backoff(consecutive_errors);
                    tracing::error!(
                        error = %e,
                        retry_in_ms = pause.as_millis() as u64,
                        "Failed to accept connection"
                    );
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr, device: &DeviceWriter) {
        // Capacity check and registration are one atomic step
        let subscription = match self.registry.register(Some(peer_addr)) {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(peer = %peer_addr, error = %e, "Connection rejected");
                return;
            }
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            subscriber_id = subscription.id(),
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let connection = Connection::new(
            SessionContext::new(session_id, peer_addr),
            socket,
            subscription,
            device.clone(),
            self.config.max_line_length,
        );

        tokio::spawn(connection.run());
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

/// Pause before retrying after `consecutive_errors` failed accepts
///
/// Doubles from [`ACCEPT_BACKOFF_BASE`] up to [`ACCEPT_BACKOFF_MAX`].
fn accept_backoff(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1u32 << exponent)
        .min(ACCEPT_BACKOFF_MAX)
}

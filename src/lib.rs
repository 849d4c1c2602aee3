//! # serial-fanout
//!
//! Broadcasts the line stream of a serial device to a bounded, changing set
//! of TCP clients, and forwards whatever the clients send back to the device.
//!
//! ```text
//! device ──► LineSource ──► Dispatcher ──► per-client queue ──► socket
//! socket ──► LineSource ──► DeviceWriter (one record at a time) ──► device
//! ```
//!
//! Every client receives every line produced while it is registered, in
//! production order. A client that falls behind is handled by the
//! configured [`OverflowPolicy`](registry::OverflowPolicy) and never stalls
//! the others for longer than the configured send timeout.
//!
//! ```no_run
//! use serial_fanout::{device, BridgeServer, DeviceConfig, ServerConfig};
//!
//! # async fn example() -> serial_fanout::Result<()> {
//! let serial = device::open(&DeviceConfig::default())?;
//! let server = BridgeServer::new(ServerConfig::default());
//! server.run(serial).await
//! # }
//! ```

pub mod device;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod source;
pub mod stats;

pub use device::{DeviceConfig, DeviceWriter};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use registry::{OverflowPolicy, RegistryConfig, RegistryError, SubscriberRegistry, Subscription};
pub use server::{BridgeServer, ServerConfig};
pub use session::CloseReason;
pub use source::{Line, LineSource};

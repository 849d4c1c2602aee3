//! Subscriber registry for line fan-out
//!
//! The registry holds the set of clients currently receiving the device's
//! line stream. Each member owns a bounded queue; the dispatcher pushes every
//! line into every member's queue and each session drains its own.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SubscriberRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ members: Arc<[Arc<Entry {    │
//!                 │     tx: mpsc::Sender<Line>,  │
//!                 │ }>]>   (copy-on-write)       │
//!                 └──────────────┬───────────────┘
//!                                │ snapshot()
//!                                ▼
//!   [LineSource] ──► Dispatcher ─┼──────────────────┬──────────────┐
//!                                ▼                  ▼              ▼
//!                          Subscription       Subscription   Subscription
//!                          rx.recv()          rx.recv()      rx.recv()
//!                              │                  │              │
//!                              └──► session ──► TCP
//! ```
//!
//! # Zero-Copy Design
//!
//! `Line` wraps `bytes::Bytes`, so every queue holds a reference-counted
//! handle to the same allocation.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;
pub mod subscription;

pub use config::{OverflowPolicy, RegistryConfig, DEFAULT_CAPACITY};
pub use entry::SubscriberEntry;
pub use error::RegistryError;
pub use store::{Snapshot, SubscriberRegistry};
pub use subscription::Subscription;

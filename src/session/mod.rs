//! Per-client sessions

pub mod close;
pub mod connection;
pub mod context;

pub use close::CloseReason;
pub use connection::Connection;
pub use context::SessionContext;

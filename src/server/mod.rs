//! Bridge server: admission and session spawning

pub mod config;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use listener::BridgeServer;

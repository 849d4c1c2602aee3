//! Server configuration

use std::net::SocketAddr;

use crate::source::DEFAULT_MAX_LINE_LENGTH;

/// Default listening port
pub const DEFAULT_PORT: u16 = 1812;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Longest record accepted from the device or a client
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            tcp_nodelay: true,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the maximum record length (at least 1)
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 1812);
        assert!(config.bind_addr.ip().is_unspecified());
        assert!(config.tcp_nodelay);
        assert_eq!(config.max_line_length, 64 * 1024);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:1813".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 1813);
    }

    #[test]
    fn test_builder_max_line_length_floor() {
        let config = ServerConfig::default().max_line_length(0);

        assert_eq!(config.max_line_length, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .tcp_nodelay(false)
            .max_line_length(512);

        assert_eq!(config.bind_addr, addr);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.max_line_length, 512);
    }
}

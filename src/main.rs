//! serial-fanout daemon
//!
//! Run with: serial-fanout [DEVICE] [BIND_ADDR]
//!
//! Examples:
//!   serial-fanout                              # /dev/ttyUSB0, 0.0.0.0:1812
//!   serial-fanout /dev/ttyACM0                 # /dev/ttyACM0, 0.0.0.0:1812
//!   serial-fanout /dev/ttyUSB1 localhost:2000  # /dev/ttyUSB1, 127.0.0.1:2000
//!
//! Then connect with e.g. `nc localhost 1812`.

use std::net::SocketAddr;
use std::process::ExitCode;

use serial_fanout::server::DEFAULT_PORT;
use serial_fanout::{device, BridgeServer, DeviceConfig, ServerConfig};

/// Parse a bind address argument
///
/// Accepts "IP:PORT", "IP", "localhost" or "localhost:PORT".
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: serial-fanout [DEVICE] [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  DEVICE       Serial device path (default: /dev/ttyUSB0)");
    eprintln!("  BIND_ADDR    Address to listen on (default: 0.0.0.0:1812)");
    eprintln!();
    eprintln!("Logging is controlled with RUST_LOG (default: info).");
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm.recv() => {},
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let device_config = match args.get(1) {
        Some(path) => DeviceConfig::with_path(path.as_str()),
        None => DeviceConfig::default(),
    };

    let mut config = ServerConfig::default();
    if let Some(addr_str) = args.get(2) {
        match parse_bind_addr(addr_str) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                return ExitCode::FAILURE;
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let serial = match device::open(&device_config) {
        Ok(serial) => serial,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let server = BridgeServer::new(config);

    match server.run_until(serial, shutdown_signal()).await {
        Ok(()) => {
            tracing::info!("Bridge stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Bridge failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_addr() {
        assert_eq!(
            parse_bind_addr("localhost").unwrap(),
            "127.0.0.1:1812".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("0.0.0.0:2000").unwrap(),
            "0.0.0.0:2000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_addr("not an address").is_err());
    }
}

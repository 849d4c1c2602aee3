//! Serial device collaborator
//!
//! Opens and configures the serial port. The rest of the crate only sees
//! the result as an `AsyncRead + AsyncWrite` stream, so tests substitute an
//! in-memory duplex pipe.

pub mod config;
pub mod writer;

pub use config::{DeviceConfig, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATH};
pub use writer::DeviceWriter;

use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::error::{Error, Result};

/// Open the serial device as a raw 8N1 stream at the configured baud rate
///
/// The port is opened read-write without becoming the controlling
/// terminal. Fails if the path does not exist or is not a terminal device.
pub fn open(config: &DeviceConfig) -> Result<SerialStream> {
    let stream = tokio_serial::new(&config.path, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|source| Error::DeviceOpen {
            path: config.path.clone(),
            source,
        })?;

    tracing::info!(
        path = %config.path,
        baud_rate = config.baud_rate,
        "Serial device opened"
    );

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_device() {
        let config = DeviceConfig::with_path("/dev/does-not-exist-serial-fanout");

        match open(&config) {
            Err(Error::DeviceOpen { path, .. }) => {
                assert_eq!(path, "/dev/does-not-exist-serial-fanout");
            }
            other => panic!("expected DeviceOpen error, got {:?}", other.map(|_| ())),
        }
    }
}

//! Serial device configuration

/// Default device path
pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyUSB0";

/// Default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial device settings
///
/// Framing is fixed at 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device file path
    pub path: String,

    /// Line speed
    pub baud_rate: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DEVICE_PATH.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl DeviceConfig {
    /// Create a config for the given device path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeviceConfig::default();

        assert_eq!(config.path, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn test_with_path() {
        let config = DeviceConfig::with_path("/dev/ttyACM0").baud_rate(9600);

        assert_eq!(config.path, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
    }
}

//! Client configuration.
//!
//! Every field has a default matching the stock firmware, so an empty YAML
//! document is a valid configuration:
//!
//! ```yaml
//! device_name: flipper
//! transport:
//!   kind: serial
//!   path: /dev/ttyACM0
//!   baud_rate: 115200
//! read_attempts: 5
//! drain_limit: 5
//! timeouts:
//!   fast_ms: 100
//!   slow_ms: 500
//!   drain_ms: 100
//!   stream_ms: 500
//! ```

use std::path::Path;
use std::time::Duration;

use fhttp_protocol::MAX_LINE_LENGTH;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::{SerialTransport, TcpTransport, Transport};

/// Baud rate the firmware's UART is fixed at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Reads attempted before a line is reported absent.
pub const DEFAULT_READ_ATTEMPTS: u32 = 5;

/// Lines a resynchronization may consume.
pub const DEFAULT_DRAIN_LIMIT: usize = 5;

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Which link to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    /// A local serial port.
    Serial {
        /// Device path, e.g. `/dev/ttyACM0` or `COM3`.
        path: String,
        /// Baud rate.
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// A TCP bridge to the board's UART.
    Tcp {
        /// `host:port` of the bridge.
        address: String,
    },
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Serial {
            path: "/dev/ttyACM0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Per-read timeouts, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Quick single-line replies (`[PING]`).
    pub fast_ms: u64,
    /// Wi-Fi, address, scan and list replies.
    pub slow_ms: u64,
    /// Each read while resynchronizing.
    pub drain_ms: u64,
    /// Stream status and body lines.
    pub stream_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            fast_ms: 100,
            slow_ms: 500,
            drain_ms: 100,
            stream_ms: 500,
        }
    }
}

impl Timeouts {
    /// Timeout for the `[PING]` reply.
    pub fn fast(&self) -> Duration {
        Duration::from_millis(self.fast_ms)
    }

    /// Timeout for single-line Wi-Fi, address and JSON replies.
    pub fn slow(&self) -> Duration {
        Duration::from_millis(self.slow_ms)
    }

    /// Timeout for each read while resynchronizing.
    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }

    /// Timeout for each stream status and body read.
    pub fn stream(&self) -> Duration {
        Duration::from_millis(self.stream_ms)
    }
}

/// Configuration for [`FlipperHttp`](crate::FlipperHttp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Name used in logs and metric labels.
    pub device_name: String,
    /// Link to the board.
    pub transport: TransportConfig,
    /// Reads attempted before a line is reported absent.
    pub read_attempts: u32,
    /// Upper bound on lines consumed by one resynchronization.
    pub drain_limit: usize,
    /// Longest reply line accepted from the board.
    pub max_line_length: usize,
    /// Per-read timeouts.
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            device_name: "flipper".to_string(),
            transport: TransportConfig::default(),
            read_attempts: DEFAULT_READ_ATTEMPTS,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            max_line_length: MAX_LINE_LENGTH,
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Open the configured link.
    pub fn open_transport(&self) -> Result<Box<dyn Transport>> {
        let transport: Box<dyn Transport> = match &self.transport {
            TransportConfig::Serial { path, baud_rate } => Box::new(SerialTransport::open_serial(
                path,
                *baud_rate,
                self.max_line_length,
            )?),
            TransportConfig::Tcp { address } => Box::new(TcpTransport::connect_tcp(
                address.as_str(),
                self.max_line_length,
            )?),
        };
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.read_attempts, 5);
        assert_eq!(config.drain_limit, 5);
        assert_eq!(config.timeouts.fast(), Duration::from_millis(100));
        assert_eq!(config.timeouts.stream(), Duration::from_millis(500));
        assert_eq!(
            config.transport,
            TransportConfig::Serial {
                path: "/dev/ttyACM0".to_string(),
                baud_rate: 115_200,
            }
        );
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ClientConfig::from_yaml_str("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "
device_name: bench
transport:
  kind: tcp
  address: 127.0.0.1:4000
timeouts:
  slow_ms: 750
";
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.device_name, "bench");
        assert_eq!(
            config.transport,
            TransportConfig::Tcp { address: "127.0.0.1:4000".to_string() }
        );
        assert_eq!(config.timeouts.slow_ms, 750);
        assert_eq!(config.timeouts.fast_ms, 100);
        assert_eq!(config.read_attempts, 5);
    }

    #[test]
    fn test_serial_baud_defaults() {
        let yaml = "
transport:
  kind: serial
  path: COM3
";
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::Serial { path: "COM3".to_string(), baud_rate: 115_200 }
        );
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(ClientConfig::from_yaml_str("read_attempts: many").is_err());
    }
}

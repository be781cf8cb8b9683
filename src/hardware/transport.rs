//! Transport adapter trait and link configuration

use crate::hardware::{LinkError, LinkResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Byte-level primitive the protocol is built on
///
/// Implementations own chip-select handling for each byte transfer. Both
/// calls block: `send_byte` until the byte has been clocked out,
/// `receive_byte` until a byte is available.
pub trait TransportAdapter {
    /// Transfer one byte to the peer
    fn send_byte(&mut self, byte: u8) -> LinkResult<()>;

    /// Wait, without bound, for the next byte from the peer
    fn receive_byte(&mut self) -> LinkResult<u8>;

    /// Wait at most `timeout` for the next byte from the peer
    /// Returns Err(LinkError::Timeout) when nothing arrived in time
    fn receive_byte_within(&mut self, timeout: Duration) -> LinkResult<u8>;
}

impl<T: TransportAdapter + ?Sized> TransportAdapter for &mut T {
    fn send_byte(&mut self, byte: u8) -> LinkResult<()> {
        (**self).send_byte(byte)
    }

    fn receive_byte(&mut self) -> LinkResult<u8> {
        (**self).receive_byte()
    }

    fn receive_byte_within(&mut self, timeout: Duration) -> LinkResult<u8> {
        (**self).receive_byte_within(timeout)
    }
}

impl<T: TransportAdapter + ?Sized> TransportAdapter for Box<T> {
    fn send_byte(&mut self, byte: u8) -> LinkResult<()> {
        (**self).send_byte(byte)
    }

    fn receive_byte(&mut self) -> LinkResult<u8> {
        (**self).receive_byte()
    }

    fn receive_byte_within(&mut self, timeout: Duration) -> LinkResult<u8> {
        (**self).receive_byte_within(timeout)
    }
}

/// Physical link selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceType {
    /// Serial port (UART or SPI bridge) opened through `serialport`
    Serial,
    /// In-memory echo for testing
    Loopback,
}

/// Link configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Communication interface type
    pub interface: InterfaceType,
    /// Port path for serial links
    pub device_path: Option<String>,
    /// Line rate applied when the port is opened; 9600 when unset
    pub baud_rate: Option<u32>,
    /// Sleep between polls while a device has no data (microseconds)
    pub poll_interval_us: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::loopback()
    }
}

impl LinkConfig {
    pub fn serial(device_path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            interface: InterfaceType::Serial,
            device_path: Some(device_path.into()),
            baud_rate: Some(baud_rate),
            poll_interval_us: 200,
        }
    }

    pub fn loopback() -> Self {
        Self {
            interface: InterfaceType::Loopback,
            device_path: None,
            baud_rate: None,
            poll_interval_us: 200,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    pub fn validate(&self) -> LinkResult<()> {
        if self.interface == InterfaceType::Serial {
            match self.device_path.as_deref() {
                None | Some("") => {
                    return Err(LinkError::Configuration {
                        parameter: "device_path".to_string(),
                        value: "None".to_string(),
                    });
                }
                Some(_) => {}
            }

            if self.baud_rate == Some(0) {
                return Err(LinkError::Configuration {
                    parameter: "baud_rate".to_string(),
                    value: "0".to_string(),
                });
            }
        }

        if self.poll_interval_us > 1_000_000 {
            return Err(LinkError::Configuration {
                parameter: "poll_interval_us".to_string(),
                value: self.poll_interval_us.to_string(),
            });
        }

        Ok(())
    }
}

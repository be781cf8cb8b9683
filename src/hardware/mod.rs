//! Hardware abstraction layer for the command link
//!
//! The protocol engine only ever sees a [`TransportAdapter`]: a blocking
//! send/receive pair for single bytes. This module provides the real bus
//! driver and in-memory stand-ins for tests and development.

pub mod transport;
pub mod serial;
pub mod loopback;
pub mod channel;
pub mod error;

pub use transport::{TransportAdapter, LinkConfig, InterfaceType};
pub use serial::{
    SerialTransport, SerialPortHandle, ChipSelect, NoChipSelect, DEFAULT_BAUD_RATE, open_device, open_device_with,
};
pub use loopback::{LoopbackTransport, ScriptedTransport};
pub use channel::ChannelTransport;
pub use error::{LinkError, LinkResult};

/// Open the transport named by a link configuration
pub fn open_transport(config: &LinkConfig) -> LinkResult<Box<dyn TransportAdapter + Send>> {
    config.validate()?;

    match config.interface {
        InterfaceType::Serial => Ok(Box::new(open_device(config)?)),
        InterfaceType::Loopback => Ok(Box::new(LoopbackTransport::new())),
    }
}
